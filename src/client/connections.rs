use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::XeroClient;
use crate::XeroResult;

/// Lists the tenants the current token has been granted access to.
pub const CONNECTIONS_URL: &str = "https://api.xero.com/connections";

/// An organisation (or practice) reachable with the current token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConnection {
    pub id: String,
    pub tenant_id: String,
    pub tenant_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_utc: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_date_utc: Option<NaiveDateTime>,
}

impl XeroClient {
    /// Fetches the tenant connections for this client's token.
    ///
    /// # Errors
    ///
    /// Propagates transport failures, non-2xx responses and malformed JSON.
    pub async fn connections(&self) -> XeroResult<Vec<TenantConnection>> {
        let connections: Vec<TenantConnection> = self.get_json(CONNECTIONS_URL, &[]).await?;
        if connections.is_empty() {
            log::warn!("No tenants are connected to this token");
        } else {
            log::info!("Discovered {} tenant connection(s)", connections.len());
        }
        Ok(connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_connection_payload() {
        let connections: Vec<TenantConnection> = serde_json::from_str(
            r#"[{
                "id": "e1eede29-f875-4a5d-8470-17f6a29a88b1",
                "authEventId": "d99ecdfe-391d-43d2-b834-17636ba90e8d",
                "tenantId": "70784a63-d24b-46a9-a4db-0e70a274b056",
                "tenantType": "ORGANISATION",
                "tenantName": "Maple Florists Ltd",
                "createdDateUtc": "2019-07-09T23:40:30.1833130",
                "updatedDateUtc": "2020-05-15T01:35:13.8491980"
            }, {
                "id": "32587c85-a9b3-4306-ac30-b416e8f2c841",
                "tenantId": "e0da6937-de07-4a14-adee-37abfac298ce",
                "tenantType": "ORGANISATION"
            }]"#,
        )
        .unwrap();

        assert_eq!(connections.len(), 2);
        assert_eq!(connections[0].tenant_name.as_deref(), Some("Maple Florists Ltd"));
        assert_eq!(
            connections[0].created_date_utc.map(|date| date.date().to_string()),
            Some("2019-07-09".to_string())
        );
        assert!(connections[1].tenant_name.is_none());
        assert!(connections[1].updated_date_utc.is_none());
    }
}
