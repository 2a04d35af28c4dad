//! 证书过期告警模板

/// 告警标题
pub fn expiring_certificate_subject() -> String {
    "Open Badge Factory certificate is expiring".to_string()
}

/// 纯文本正文
pub fn expiring_certificate_text(days: i64, obf_url: &str) -> String {
    format!(
        "The certificate of the Open Badge Factory client expires in {days} {unit}. \
         Please renew the certificate at {obf_url} before it expires, \
         otherwise badges can no longer be issued.",
        unit = day_unit(days),
    )
}

/// HTML 正文
pub fn expiring_certificate_html(days: i64, obf_url: &str) -> String {
    format!(
        "<p>The certificate of the Open Badge Factory client expires in \
         <strong>{days} {unit}</strong>.</p>\
         <p>Please renew the certificate at <a href=\"{obf_url}\">{obf_url}</a> \
         before it expires, otherwise badges can no longer be issued.</p>",
        unit = day_unit(days),
    )
}

fn day_unit(days: i64) -> &'static str {
    if days == 1 { "day" } else { "days" }
}
