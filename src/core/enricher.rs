//! Financial enrichment from the accounts register (regnskapsregisteret).

use crate::domain::catalog::{FieldCatalog, FieldKind};
use crate::domain::model::{FieldValue, FinancialSnapshot, OrgNumber};
use crate::domain::ports::StatementSource;
use serde_json::Value;
use std::sync::Arc;

/// (ratio key, numerator key, denominator key)
const RATIOS: &[(&str, &str, &str)] = &[
    ("profit_margin", "net_profit", "revenue"),
    ("equity_ratio", "total_equity", "total_assets"),
    ("debt_ratio", "total_debt", "total_assets"),
    ("return_on_equity", "net_profit", "total_equity"),
];

pub struct FinancialEnricher<S: StatementSource> {
    source: S,
    catalog: Arc<FieldCatalog>,
}

impl<S: StatementSource> FinancialEnricher<S> {
    pub fn new(source: S, catalog: Arc<FieldCatalog>) -> Self {
        Self { source, catalog }
    }

    /// Fetches the statements of one entity and builds its snapshot.
    ///
    /// Never fails: an invalid identifier, a transport error, a non-list body
    /// or an empty list all produce [`FinancialSnapshot::no_data`]. Performs
    /// at most one request; throttling is the caller's responsibility.
    pub async fn enrich(&self, org_id: &str) -> FinancialSnapshot {
        let Some(org) = OrgNumber::parse(org_id) else {
            tracing::debug!("Skipping enrichment for invalid org number '{}'", org_id);
            return FinancialSnapshot::no_data();
        };

        match self.source.fetch_statements(org.as_str()).await {
            Ok(body) => {
                let snapshot = self.snapshot_from_statements(&body);
                if snapshot.is_empty() {
                    tracing::debug!("📭 No financial statements for {}", org);
                }
                snapshot
            }
            Err(e) => {
                tracing::warn!("⚠️ Could not fetch financials for {}: {}", org, e);
                FinancialSnapshot::no_data()
            }
        }
    }

    pub fn snapshot_from_statements(&self, body: &Value) -> FinancialSnapshot {
        match latest_statement(body) {
            Some(statement) => build_snapshot(statement, &self.catalog),
            None => FinancialSnapshot::no_data(),
        }
    }
}

/// Picks the statement with the greatest `regnskapsperiode.tilDato`.
///
/// ISO dates compare correctly as strings; statements without an end date
/// sort first. On ties the earliest entry in the list wins.
pub fn latest_statement(body: &Value) -> Option<&Value> {
    let statements = body.as_array()?;
    statements
        .iter()
        .filter(|s| s.is_object())
        .reduce(|best, candidate| {
            if period_end(candidate) > period_end(best) {
                candidate
            } else {
                best
            }
        })
}

fn period_end(statement: &Value) -> &str {
    lookup(statement, &["regnskapsperiode", "tilDato"])
        .and_then(Value::as_str)
        .unwrap_or("")
}

/// Null-safe nested lookup: any missing step yields `None`.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

pub fn build_snapshot(statement: &Value, catalog: &FieldCatalog) -> FinancialSnapshot {
    let mut snapshot = FinancialSnapshot::no_data();

    for spec in catalog.financial().filter(|f| !f.source.is_empty()) {
        let value = lookup(statement, spec.source)
            .map(FieldValue::from_json)
            .unwrap_or(FieldValue::Empty);
        snapshot.insert(spec.key, value);
    }

    for (ratio, numerator, denominator) in RATIOS {
        let Some(spec) = catalog.get(ratio).filter(|s| s.kind == FieldKind::Ratio) else {
            continue;
        };
        let value = percentage(snapshot.get(numerator), snapshot.get(denominator));
        snapshot.insert(spec.key, value);
    }

    snapshot
}

/// `numerator / denominator * 100` with two decimals, or empty when either
/// side is missing or non-numeric, or the denominator is zero.
pub fn percentage(numerator: Option<&FieldValue>, denominator: Option<&FieldValue>) -> FieldValue {
    let (Some(num), Some(den)) = (
        numerator.and_then(FieldValue::as_number),
        denominator.and_then(FieldValue::as_number),
    ) else {
        return FieldValue::Empty;
    };

    if den == 0.0 {
        return FieldValue::Empty;
    }

    let ratio = num / den * 100.0;
    if ratio.is_finite() {
        FieldValue::Text(format!("{:.2}", ratio))
    } else {
        FieldValue::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{EtlError, Result};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockStatements {
        body: Option<Value>,
        calls: Arc<AtomicUsize>,
    }

    impl MockStatements {
        fn new(body: Option<Value>) -> Self {
            Self {
                body,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait::async_trait]
    impl StatementSource for MockStatements {
        async fn fetch_statements(&self, _org_id: &str) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body.clone().ok_or_else(|| EtlError::HttpStatusError {
                status: 500,
                url: "http://accounts.test".to_string(),
            })
        }
    }

    fn statement(end: &str, revenue: Value, net_profit: Value) -> Value {
        json!({
            "regnskapsperiode": {"fraDato": "2023-01-01", "tilDato": end},
            "valuta": "NOK",
            "resultatregnskapResultat": {
                "aarsresultat": net_profit,
                "driftsresultat": {"driftsinntekter": {"sumDriftsinntekter": revenue}}
            },
            "eiendeler": {"sumEiendeler": 1000},
            "egenkapitalGjeld": {
                "egenkapital": {"sumEgenkapital": 400},
                "gjeldOversikt": {"sumGjeld": 600}
            }
        })
    }

    fn enricher(body: Option<Value>) -> (FinancialEnricher<MockStatements>, Arc<AtomicUsize>) {
        let source = MockStatements::new(body);
        let calls = source.calls.clone();
        (
            FinancialEnricher::new(source, Arc::new(FieldCatalog::standard())),
            calls,
        )
    }

    #[test]
    fn test_ratio_examples() {
        assert_eq!(
            percentage(Some(&FieldValue::Number(50.0)), Some(&FieldValue::Number(200.0))),
            FieldValue::text("25.00")
        );
        assert_eq!(
            percentage(Some(&FieldValue::Number(50.0)), Some(&FieldValue::Number(0.0))),
            FieldValue::Empty
        );
        assert_eq!(
            percentage(Some(&FieldValue::text("n/a")), Some(&FieldValue::Number(10.0))),
            FieldValue::Empty
        );
        assert_eq!(percentage(None, Some(&FieldValue::Number(10.0))), FieldValue::Empty);
        assert_eq!(
            percentage(Some(&FieldValue::text("1 000")), Some(&FieldValue::text("3,000"))),
            FieldValue::text("33.33")
        );
    }

    #[test]
    fn test_latest_statement_by_period_end() {
        let body = json!([
            statement("2021-12-31", json!(1), json!(1)),
            statement("2023-12-31", json!(3), json!(3)),
            statement("2022-12-31", json!(2), json!(2)),
        ]);
        let latest = latest_statement(&body).unwrap();
        assert_eq!(period_end(latest), "2023-12-31");
        assert!(latest_statement(&json!([])).is_none());
        assert!(latest_statement(&json!({"error": "not found"})).is_none());
    }

    #[test]
    fn test_build_snapshot_values_and_ratios() {
        let catalog = FieldCatalog::standard();
        let snapshot = build_snapshot(&statement("2023-12-31", json!(200), json!(50)), &catalog);

        assert_eq!(snapshot.get("revenue"), Some(&FieldValue::Number(200.0)));
        assert_eq!(snapshot.get("net_profit"), Some(&FieldValue::Number(50.0)));
        assert_eq!(snapshot.get("currency"), Some(&FieldValue::text("NOK")));
        assert_eq!(snapshot.get("period_end"), Some(&FieldValue::text("2023-12-31")));
        assert_eq!(snapshot.get("short_term_debt"), Some(&FieldValue::Empty));
        assert_eq!(snapshot.get("profit_margin"), Some(&FieldValue::text("25.00")));
        assert_eq!(snapshot.get("equity_ratio"), Some(&FieldValue::text("40.00")));
        assert_eq!(snapshot.get("debt_ratio"), Some(&FieldValue::text("60.00")));
        assert_eq!(snapshot.get("return_on_equity"), Some(&FieldValue::text("12.50")));
    }

    #[test]
    fn test_zero_assets_leave_ratios_empty() {
        let catalog = FieldCatalog::standard();
        let mut raw = statement("2023-12-31", json!(200), json!(50));
        raw["eiendeler"]["sumEiendeler"] = json!(0);
        let snapshot = build_snapshot(&raw, &catalog);
        assert_eq!(snapshot.get("equity_ratio"), Some(&FieldValue::Empty));
        assert_eq!(snapshot.get("debt_ratio"), Some(&FieldValue::Empty));
        assert_eq!(snapshot.get("profit_margin"), Some(&FieldValue::text("25.00")));
    }

    #[tokio::test]
    async fn test_enrich_uses_latest_statement() {
        let body = json!([
            statement("2022-12-31", json!(100), json!(10)),
            statement("2023-12-31", json!(200), json!(50)),
        ]);
        let (enricher, calls) = enricher(Some(body));

        let snapshot = enricher.enrich("923609016").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.get("revenue"), Some(&FieldValue::Number(200.0)));
        assert_eq!(snapshot.get("profit_margin"), Some(&FieldValue::text("25.00")));
    }

    #[tokio::test]
    async fn test_enrich_invalid_id_short_circuits() {
        let (enricher, calls) = enricher(Some(json!([])));
        assert!(enricher.enrich("").await.is_empty());
        assert!(enricher.enrich("not-a-number").await.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_enrich_failures_become_no_data() {
        let (failing, _) = enricher(None);
        assert!(failing.enrich("923609016").await.is_empty());

        let (not_a_list, _) = enricher(Some(json!({"status": 404})));
        assert!(not_a_list.enrich("923609016").await.is_empty());

        let (empty, calls) = enricher(Some(json!([])));
        assert!(empty.enrich("923609016").await.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
