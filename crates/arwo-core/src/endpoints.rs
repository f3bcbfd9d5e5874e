//! Remedy REST endpoint paths and URL assembly.

/// JWT login endpoint. Credentials are form-encoded in the body; a 200
/// response body is the bearer token itself.
pub const LOGIN_PATH: &str = "/api/jwt/login";

/// JWT logout endpoint. Invalidates the presented bearer token.
pub const LOGOUT_PATH: &str = "/api/jwt/logout";

/// Root of the AR System entry API.
pub const ENTRY_API: &str = "/api/arsys/v1/entry";

/// Interface form that creates work orders.
pub const CREATE_FORM: &str = "WOI:WorkOrderInterface_Create";

/// Work-order form, used for both id resolution and modification.
pub const WORK_ORDER_FORM: &str = "WOI:WorkOrder";

/// Work-info form that receives file attachments.
pub const WORK_INFO_FORM: &str = "WOI:WorkInfo";

/// People directory form, queried for a company's generic user.
pub const PEOPLE_FORM: &str = "CTM:People";

/// Support-group directory form.
pub const SUPPORT_GROUP_FORM: &str = "CTM:Support Group";

/// Per-company assignment routing table.
pub const ASSIGNMENT_FORM: &str = "KIO:CFG:Assignment";

/// Builds `<base>/api/arsys/v1/entry/<form>`.
#[must_use]
pub fn entry_url(api_base: &str, form: &str) -> String {
    format!("{api_base}{ENTRY_API}/{form}")
}

/// Builds `<base>/api/arsys/v1/entry/<form>/<id>`.
#[must_use]
pub fn entry_item_url(api_base: &str, form: &str, id: &str) -> String {
    format!("{api_base}{ENTRY_API}/{form}/{id}")
}

/// Builds an AR System qualification clause, `'Field'="value"`.
#[must_use]
pub fn qualification(field: &str, value: &str) -> String {
    format!("'{field}'=\"{value}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_url() {
        assert_eq!(
            entry_url("https://remedy.example.com", WORK_ORDER_FORM),
            "https://remedy.example.com/api/arsys/v1/entry/WOI:WorkOrder"
        );
    }

    #[test]
    fn test_entry_item_url() {
        assert_eq!(
            entry_item_url("https://remedy.example.com", WORK_ORDER_FORM, "WO0000000042|42"),
            "https://remedy.example.com/api/arsys/v1/entry/WOI:WorkOrder/WO0000000042|42"
        );
    }

    #[test]
    fn test_qualification_quotes_field_and_value() {
        assert_eq!(
            qualification("Work Order ID", "WO0000000042"),
            "'Work Order ID'=\"WO0000000042\""
        );
    }
}
