use std::time::Duration;

use log::{error, info};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};

use super::decode::{parse_body, value_to_string};
use super::pacing::Pause;
use super::session::ApiSession;
use super::transport::{ApiRequest, Transport};
use super::SymbolId;

const SYMBOLS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SymbolCatalog {
    symbols: Vec<SymbolEntry>,
}

#[derive(Debug, Deserialize)]
struct SymbolEntry {
    name: String,
    id: Value,
}

impl<T: Transport, P: Pause> ApiSession<T, P> {
    /// Look the symbol up in the account's catalog (single response, no
    /// paging) and cache its id on the session.
    pub fn resolve_symbol(&mut self, account_id: &str, symbol: &str) -> Result<SymbolId> {
        info!("Resolving symbol id for {symbol}...");
        let request = ApiRequest::get(
            self.endpoints
                .api(&format!("tradingaccounts/{account_id}/symbols")),
            SYMBOLS_TIMEOUT,
        );

        let response = self
            .transport
            .execute(&request)
            .and_then(|response| response.error_for_status("symbol catalog"))
            .map_err(|err| {
                error!("Failed to fetch symbol catalog: {err}");
                err
            })?;

        let catalog: SymbolCatalog = parse_body(&response.body, "symbol catalog")?;
        let Some(entry) = catalog
            .symbols
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(symbol))
        else {
            error!("Symbol {symbol} not found in account {account_id}");
            return Err(AppError::SymbolNotFound {
                symbol: symbol.to_string(),
                account_id: account_id.to_string(),
            });
        };

        let id = SymbolId(value_to_string(&entry.id));
        info!("Symbol {} resolved to id {id}", entry.name);
        self.symbol_id = Some(id.clone());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{ok, status, test_session, ScriptedTransport};
    use reqwest::StatusCode;

    const CATALOG: &str = r#"{
        "symbols": [
            {"name": "GBPUSD", "id": 2},
            {"name": "EURUSD", "id": 1},
            {"name": "XAUUSD", "id": "gold-41"}
        ]
    }"#;

    #[test]
    fn matches_case_insensitively() {
        let mut session = test_session(ScriptedTransport::new(vec![ok(CATALOG)]));

        let id = session.resolve_symbol("1001", "eurusd").expect("symbol resolves");

        assert_eq!(id, SymbolId("1".to_string()));
        assert_eq!(session.symbol_id(), Some(&id));
        assert_eq!(
            session.transport().urls(),
            vec!["https://api.example.test/connect/tradingaccounts/1001/symbols"]
        );
    }

    #[test]
    fn keeps_textual_ids() {
        let mut session = test_session(ScriptedTransport::new(vec![ok(CATALOG)]));
        let id = session.resolve_symbol("1001", "XauUsd").unwrap();
        assert_eq!(id.to_string(), "gold-41");
    }

    #[test]
    fn missing_symbol_is_an_error() {
        let mut session = test_session(ScriptedTransport::new(vec![ok(CATALOG)]));

        let err = session.resolve_symbol("1001", "USDJPY").expect_err("not listed");

        assert!(matches!(err, AppError::SymbolNotFound { .. }));
        assert!(session.symbol_id().is_none());
    }

    #[test]
    fn http_error_is_an_error() {
        let mut session = test_session(ScriptedTransport::new(vec![status(
            StatusCode::NOT_FOUND,
            "no such account",
        )]));
        let err = session.resolve_symbol("999", "EURUSD").expect_err("404");
        assert!(err.to_string().contains("no such account"));
    }
}
