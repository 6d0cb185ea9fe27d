//! Catalog of the OAuth2 scopes understood by the Xero API.

/// Scope requested for every API so a refresh token is issued.
pub const BASE_SCOPE: &str = "offline_access";

/// Every scope the Xero identity service accepts.
pub const VALID_SCOPES: [&str; 33] = [
    "offline_access",
    "openid",
    "profile",
    "email",
    "accounting.transactions",
    "accounting.transactions.read",
    "accounting.reports.read",
    "accounting.journals.read",
    "accounting.settings",
    "accounting.settings.read",
    "accounting.contacts",
    "accounting.contacts.read",
    "accounting.attachments",
    "accounting.attachments.read",
    "payroll.employees",
    "payroll.employees.read",
    "payroll.payruns",
    "payroll.payruns.read",
    "payroll.payslip",
    "payroll.payslip.read",
    "payroll.timesheets",
    "payroll.timesheets.read",
    "payroll.settings",
    "payroll.settings.read",
    "files",
    "files.read",
    // Older scope lists spell the files read scope this way.
    "file.read",
    "assets",
    "assets.read",
    "projects",
    "projects.read",
    "paymentservices",
    "bankfeeds",
];

const ACCOUNTING_TYPES: [&str; 4] = ["transactions", "settings", "contacts", "attachments"];
const PAYROLL_TYPES: [&str; 5] = ["employees", "payruns", "payslip", "timesheets", "settings"];

/// Returns the scopes to request for `api`.
///
/// `api` is one of `openid`, `accounting`, `payroll_<country>`, `files`,
/// `assets`, `projects`, `restricted` or `custom`. For `custom` only the
/// entries of `custom` that are valid scopes are returned, in their given
/// order. Any other name yields just [`BASE_SCOPE`].
///
/// Duplicates are never removed.
#[must_use]
pub fn valid_scopes(api: &str, custom: &[&str]) -> Vec<String> {
    if api == "custom" {
        return custom
            .iter()
            .filter(|scope| is_valid_scope(scope))
            .map(|scope| (*scope).to_string())
            .collect();
    }

    let mut scopes = vec![BASE_SCOPE.to_string()];
    match api {
        "openid" => scopes.extend(owned(&["openid", "profile", "email"])),
        "accounting" => {
            scopes.extend(read_write_pairs("accounting", &ACCOUNTING_TYPES));
            scopes.extend(owned(&["accounting.reports.read", "accounting.journals.read"]));
        }
        // TODO: split payroll_au, payroll_uk and payroll_nz once their scope sets diverge
        payroll if payroll.starts_with("payroll") => {
            scopes.extend(read_write_pairs("payroll", &PAYROLL_TYPES));
        }
        "files" => scopes.extend(owned(&["files", "files.read"])),
        "assets" => scopes.extend(owned(&["assets", "assets.read"])),
        "projects" => scopes.extend(owned(&["projects", "projects.read"])),
        "restricted" => scopes.extend(owned(&["paymentservices", "bankfeeds"])),
        _ => {}
    }
    scopes
}

/// Checks `scope` against [`VALID_SCOPES`].
#[must_use]
pub fn is_valid_scope(scope: &str) -> bool {
    VALID_SCOPES.contains(&scope)
}

fn owned<'a>(scopes: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
    scopes.iter().map(|scope| (*scope).to_string())
}

fn read_write_pairs<'a>(prefix: &'a str, kinds: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
    kinds
        .iter()
        .flat_map(move |kind| [format!("{prefix}.{kind}"), format!("{prefix}.{kind}.read")])
}
