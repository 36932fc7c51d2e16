//! The fixed set of fields the tool knows how to extract, filter on and write.
//!
//! The catalog is built once at startup ([`FieldCatalog::standard`]) and shared
//! by reference; nothing mutates it afterwards.

use crate::domain::model::Column;
use crate::utils::error::{EtlError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    General,
    Financial,
}

/// Decides how a stored value is coerced for filtering and formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Flag,
    Count,
    Amount,
    Ratio,
}

impl FieldKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldKind::Count | FieldKind::Amount | FieldKind::Ratio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub group: FieldGroup,
    pub kind: FieldKind,
    /// JSON path inside one accounts statement. Empty for general fields and
    /// for derived ratios.
    pub source: &'static [&'static str],
}

impl FieldSpec {
    pub fn is_financial(&self) -> bool {
        self.group == FieldGroup::Financial
    }

    pub fn column(&self) -> Column {
        Column {
            key: self.key,
            label: self.label,
        }
    }
}

const fn general(key: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        key,
        label,
        group: FieldGroup::General,
        kind,
        source: &[],
    }
}

const fn financial(
    key: &'static str,
    label: &'static str,
    kind: FieldKind,
    source: &'static [&'static str],
) -> FieldSpec {
    FieldSpec {
        key,
        label,
        group: FieldGroup::Financial,
        kind,
        source,
    }
}

const GENERAL_FIELDS: &[FieldSpec] = &[
    general("name", "Name", FieldKind::Text),
    general("orgnr", "OrgNo", FieldKind::Text),
    general("incorporation_date", "IncorporationDate", FieldKind::Date),
    general("registration_date", "RegistrationDate", FieldKind::Date),
    general("email", "Email", FieldKind::Text),
    general("phone", "Phone", FieldKind::Text),
    general("mobile", "Mobile", FieldKind::Text),
    general("website", "Website", FieldKind::Text),
    general("address", "Address", FieldKind::Text),
    general("zipcode", "Zipcode", FieldKind::Text),
    general("municipality", "Municipality", FieldKind::Text),
    general("street", "Street", FieldKind::Text),
    general("in_liquidation", "InLiquidation", FieldKind::Flag),
    general("employees", "Employees", FieldKind::Count),
];

const FINANCIAL_FIELDS: &[FieldSpec] = &[
    financial("period_start", "PeriodStart", FieldKind::Date, &["regnskapsperiode", "fraDato"]),
    financial("period_end", "PeriodEnd", FieldKind::Date, &["regnskapsperiode", "tilDato"]),
    financial("currency", "Currency", FieldKind::Text, &["valuta"]),
    financial(
        "revenue",
        "Revenue",
        FieldKind::Amount,
        &["resultatregnskapResultat", "driftsresultat", "driftsinntekter", "sumDriftsinntekter"],
    ),
    financial(
        "operating_expenses",
        "OperatingExpenses",
        FieldKind::Amount,
        &["resultatregnskapResultat", "driftsresultat", "driftskostnad", "sumDriftskostnad"],
    ),
    financial(
        "operating_profit",
        "OperatingProfit",
        FieldKind::Amount,
        &["resultatregnskapResultat", "driftsresultat", "driftsresultat"],
    ),
    financial(
        "financial_income",
        "FinancialIncome",
        FieldKind::Amount,
        &["resultatregnskapResultat", "finansresultat", "finansinntekt", "sumFinansinntekter"],
    ),
    financial(
        "financial_expenses",
        "FinancialExpenses",
        FieldKind::Amount,
        &["resultatregnskapResultat", "finansresultat", "finanskostnad", "sumFinanskostnad"],
    ),
    financial(
        "net_financial_items",
        "NetFinancialItems",
        FieldKind::Amount,
        &["resultatregnskapResultat", "finansresultat", "nettoFinans"],
    ),
    financial(
        "profit_before_tax",
        "ProfitBeforeTax",
        FieldKind::Amount,
        &["resultatregnskapResultat", "ordinaertResultatFoerSkattekostnad"],
    ),
    financial(
        "net_profit",
        "NetProfit",
        FieldKind::Amount,
        &["resultatregnskapResultat", "aarsresultat"],
    ),
    financial(
        "total_result",
        "TotalResult",
        FieldKind::Amount,
        &["resultatregnskapResultat", "totalresultat"],
    ),
    financial("total_assets", "TotalAssets", FieldKind::Amount, &["eiendeler", "sumEiendeler"]),
    financial(
        "fixed_assets",
        "FixedAssets",
        FieldKind::Amount,
        &["eiendeler", "anleggsmidler", "sumAnleggsmidler"],
    ),
    financial(
        "current_assets",
        "CurrentAssets",
        FieldKind::Amount,
        &["eiendeler", "omloepsmidler", "sumOmloepsmidler"],
    ),
    financial(
        "total_equity",
        "TotalEquity",
        FieldKind::Amount,
        &["egenkapitalGjeld", "egenkapital", "sumEgenkapital"],
    ),
    financial(
        "paid_in_equity",
        "PaidInEquity",
        FieldKind::Amount,
        // sic: the upstream schema spells it "Egenkaptial"
        &["egenkapitalGjeld", "egenkapital", "innskuttEgenkapital", "sumInnskuttEgenkaptial"],
    ),
    financial(
        "retained_earnings",
        "RetainedEarnings",
        FieldKind::Amount,
        &["egenkapitalGjeld", "egenkapital", "opptjentEgenkapital", "sumOpptjentEgenkapital"],
    ),
    financial(
        "total_debt",
        "TotalDebt",
        FieldKind::Amount,
        &["egenkapitalGjeld", "gjeldOversikt", "sumGjeld"],
    ),
    financial(
        "long_term_debt",
        "LongTermDebt",
        FieldKind::Amount,
        &["egenkapitalGjeld", "gjeldOversikt", "langsiktigGjeld", "sumLangsiktigGjeld"],
    ),
    financial(
        "short_term_debt",
        "ShortTermDebt",
        FieldKind::Amount,
        &["egenkapitalGjeld", "gjeldOversikt", "kortsiktigGjeld", "sumKortsiktigGjeld"],
    ),
    financial("profit_margin", "ProfitMarginPct", FieldKind::Ratio, &[]),
    financial("equity_ratio", "EquityRatioPct", FieldKind::Ratio, &[]),
    financial("debt_ratio", "DebtRatioPct", FieldKind::Ratio, &[]),
    financial("return_on_equity", "ReturnOnEquityPct", FieldKind::Ratio, &[]),
];

/// Older scripts called the municipality column `state`.
const ALIASES: &[(&str, &str)] = &[("state", "municipality"), ("orgno", "orgnr")];

#[derive(Debug, Clone)]
pub struct FieldCatalog {
    fields: Vec<FieldSpec>,
}

impl FieldCatalog {
    pub fn standard() -> Self {
        Self {
            fields: GENERAL_FIELDS
                .iter()
                .chain(FINANCIAL_FIELDS.iter())
                .copied()
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Case-insensitive lookup that also understands legacy aliases.
    pub fn resolve(&self, name: &str) -> Option<&FieldSpec> {
        let lowered = name.trim().to_lowercase();
        let key = ALIASES
            .iter()
            .find(|(alias, _)| *alias == lowered)
            .map(|(_, key)| *key)
            .unwrap_or(lowered.as_str());
        self.get(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn general(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| !f.is_financial())
    }

    pub fn financial(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_financial())
    }

    /// Output column order for a run.
    ///
    /// General columns come first, in the requested order (all of them when
    /// nothing is requested). Financial columns are appended only when
    /// enrichment is on: the requested financial keys, or all of them when
    /// none were named. Unknown names are skipped; a request with no usable
    /// name at all is an error.
    pub fn select_columns(
        &self,
        requested: Option<&[String]>,
        include_financials: bool,
    ) -> Result<Vec<Column>> {
        let Some(requested) = requested.filter(|r| !r.is_empty()) else {
            let mut columns: Vec<Column> = self.general().map(FieldSpec::column).collect();
            if include_financials {
                columns.extend(self.financial().map(FieldSpec::column));
            }
            return Ok(columns);
        };

        let mut general = Vec::new();
        let mut financial = Vec::new();
        for name in requested {
            match self.resolve(name) {
                Some(spec) if spec.is_financial() => {
                    if !financial.contains(&spec.column()) {
                        financial.push(spec.column());
                    }
                }
                Some(spec) => {
                    if !general.contains(&spec.column()) {
                        general.push(spec.column());
                    }
                }
                None => tracing::warn!("⚠️ Ignoring unknown field '{}'", name.trim()),
            }
        }

        if general.is_empty() && financial.is_empty() {
            return Err(EtlError::InvalidConfigValueError {
                field: "fields".to_string(),
                value: requested.join(","),
                reason: format!(
                    "No valid fields selected. Available: {}",
                    self.fields().map(|f| f.key).collect::<Vec<_>>().join(", ")
                ),
            });
        }

        if include_financials {
            if financial.is_empty() {
                financial.extend(self.financial().map(FieldSpec::column));
            }
            general.extend(financial);
        } else if !financial.is_empty() {
            tracing::warn!(
                "⚠️ Financial fields requested without --financials; they will be left out"
            );
            if general.is_empty() {
                return Err(EtlError::ConfigError {
                    message: "Only financial fields were selected but --financials is off"
                        .to_string(),
                });
            }
        }

        Ok(general)
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Parses amounts such as `1 234 567`, `1,234,567` or `-42.5`.
///
/// Grouping characters (space, no-break space, comma, apostrophe, underscore)
/// are dropped before parsing. Non-finite results are treated as unparseable.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}' | ',' | '\'' | '_'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_groups() {
        let catalog = FieldCatalog::standard();
        assert_eq!(catalog.general().count(), 14);
        assert_eq!(catalog.financial().count(), 25);
        let is_financial = |key: &str| catalog.get(key).is_some_and(FieldSpec::is_financial);
        assert!(is_financial("net_profit"));
        assert!(is_financial("profit_margin"));
        assert!(!is_financial("email"));
        assert!(!is_financial("nonexistent"));
    }

    #[test]
    fn test_keys_are_unique() {
        let catalog = FieldCatalog::standard();
        let mut keys: Vec<_> = catalog.fields().map(|f| f.key).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }

    #[test]
    fn test_resolve_aliases() {
        let catalog = FieldCatalog::standard();
        assert_eq!(catalog.resolve("state").unwrap().key, "municipality");
        assert_eq!(catalog.resolve(" Email ").unwrap().key, "email");
        assert!(catalog.resolve("fax").is_none());
    }

    #[test]
    fn test_select_columns_defaults() {
        let catalog = FieldCatalog::standard();
        let columns = catalog.select_columns(None, false).unwrap();
        assert_eq!(columns.len(), 14);
        assert_eq!(columns[0].label, "Name");

        let columns = catalog.select_columns(None, true).unwrap();
        assert_eq!(columns.len(), 39);
        assert_eq!(columns[14].key, "period_start");
    }

    #[test]
    fn test_select_columns_keeps_requested_order() {
        let catalog = FieldCatalog::standard();
        let requested = vec!["email".to_string(), "name".to_string(), "bogus".to_string()];
        let columns = catalog.select_columns(Some(requested.as_slice()), false).unwrap();
        let keys: Vec<_> = columns.iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["email", "name"]);
    }

    #[test]
    fn test_select_columns_financial_subset() {
        let catalog = FieldCatalog::standard();
        let requested = vec![
            "revenue".to_string(),
            "name".to_string(),
            "profit_margin".to_string(),
        ];
        let columns = catalog.select_columns(Some(requested.as_slice()), true).unwrap();
        let keys: Vec<_> = columns.iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["name", "revenue", "profit_margin"]);
    }

    #[test]
    fn test_select_columns_rejects_nothing_valid() {
        let catalog = FieldCatalog::standard();
        let requested = vec!["fax".to_string()];
        assert!(catalog.select_columns(Some(requested.as_slice()), false).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1 234 567"), Some(1_234_567.0));
        assert_eq!(parse_amount("1,234,567"), Some(1_234_567.0));
        assert_eq!(parse_amount("\u{a0}-42.5 "), Some(-42.5));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("inf"), None);
    }
}
