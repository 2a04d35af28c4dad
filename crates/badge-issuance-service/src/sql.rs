//! 用户列表排序 SQL
//!
//! 生成宿主用户列表的 ORDER BY 子句。带搜索词时，全名或任一字段精确匹配
//! （不区分大小写）的用户排在最前。

use std::collections::BTreeMap;

const PARAM_PREFIX: &str = "usersortexact";

/// 生成排序子句与命名参数
///
/// `alias` 为用户表别名，`extra_fields` 为额外参与精确匹配的字段。
pub fn users_order_by_sql(
    alias: &str,
    search: Option<&str>,
    extra_fields: &[&str],
) -> (String, BTreeMap<String, String>) {
    let prefix = if alias.is_empty() {
        String::new()
    } else {
        format!("{alias}.")
    };

    let sort = format!("{prefix}lastname, {prefix}firstname, {prefix}id");
    let mut params = BTreeMap::new();

    let search = match search {
        Some(s) if !s.is_empty() => s,
        _ => return (sort, params),
    };

    let mut index = 1;
    let mut next_key = || {
        let key = format!("{PARAM_PREFIX}{index}");
        index += 1;
        key
    };

    let mut conditions = Vec::new();

    let key = next_key();
    conditions.push(format!(
        "CONCAT({prefix}firstname, ' ', {prefix}lastname) = :{key}"
    ));
    params.insert(key, search.to_string());

    for field in ["firstname", "lastname"].iter().chain(extra_fields.iter()) {
        let key = next_key();
        conditions.push(format!("LOWER({prefix}{field}) = LOWER(:{key})"));
        params.insert(key, search.to_string());
    }

    let sort = format!(
        "CASE WHEN {} THEN 0 ELSE 1 END, {sort}",
        conditions.join(" OR ")
    );
    (sort, params)
}
