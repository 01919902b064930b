//! Per-domain records stored for a symbol.
//!
//! Every record is an independently refreshed slice of market data keyed by
//! [`Symbol`](crate::core::Symbol). Field names match the wire format
//! (camelCase); absent values are omitted on serialization rather than
//! written as `null`. Percentages are plain numbers where `1.0` means 1%.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Declares a record whose fields are optional, with an optional leading
/// bracket of mandatory fields.
macro_rules! domain_record {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$fmeta:meta])* $opt:ident : $opt_ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            $(
                $(#[$fmeta])*
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $opt: Option<$opt_ty>,
            )*
        }
    };
    (
        $(#[$meta:meta])*
        $name:ident [ $( $(#[$rmeta:meta])* $req:ident : $req_ty:ty ),* $(,)? ] {
            $( $(#[$fmeta:meta])* $opt:ident : $opt_ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            $(
                $(#[$rmeta])*
                pub $req: $req_ty,
            )*
            $(
                $(#[$fmeta])*
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $opt: Option<$opt_ty>,
            )*
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetClass {
    Equity,
    Etf,
    Fund,
    Adr,
    Reit,
    FixedIncome,
    Derivative,
    Crypto,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityType {
    CommonStock,
    PreferredStock,
    Adr,
    Etf,
    ClosedEndFund,
    MutualFund,
    Reit,
    DepositaryReceipt,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DividendFrequency {
    None,
    Annual,
    SemiAnnual,
    Quarterly,
    Monthly,
    Irregular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradingStatus {
    Active,
    Halted,
    Suspended,
    Delisted,
    PreIpo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalystConsensusRating {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

/// When an earnings release happens relative to the trading session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EarningsSession {
    /// Before market open
    Bmo,
    /// After market close
    Amc,
    DuringSession,
    Unknown,
}

domain_record! {
    /// Exchange-qualified identifiers of an instrument.
    Identifiers [
        symbol: String,
        exchange: String,
        exchange_mic: String,
        listing_country: String,
        currency: String,
    ] {
        isin: String,
        cusip: String,
        sedol: String,
        figi: String,
        composite_figi: String,
        share_class_figi: String,
        cik: String,
        ticker_yahoo: String,
        ticker_google: String,
        ticker_bloomberg: String,
    }
}

domain_record! {
    Metadata [company_name: String] {
        company_short_name: String,
        description_short: String,
        description_long: String,
        website_url: String,
        headquarters_city: String,
        headquarters_country: String,
        country_of_incorporation: String,
        country_of_domicile: String,
        founded_year: i32,
        ipo_date: NaiveDate,
        employees: u64,
        primary_timezone: String,
    }
}

/// The mandatory record: without it a symbol is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub identifiers: Identifiers,
    pub metadata: Metadata,
    pub asset_class: AssetClass,
    pub security_type: SecurityType,
}

domain_record! {
    /// Sector and industry placement beyond the identity's asset class.
    ClassificationDetails {
        share_class: String,
        sector: String,
        industry: String,
        gics_sector: String,
        gics_industry_group: String,
        gics_industry: String,
        gics_sub_industry: String,
        naics_code: String,
        sic_code: String,
        style_box: String,
        index_memberships: Vec<String>,
    }
}

domain_record! {
    Quote [last: f64, last_timestamp: DateTime<Utc>] {
        last_size: f64,
        open: f64,
        high: f64,
        low: f64,
        prev_close: f64,
        prev_close_date: NaiveDate,
        bid: f64,
        bid_size: f64,
        ask: f64,
        ask_size: f64,
        volume: f64,
        average_volume_10d: f64,
        average_volume_30d: f64,
        average_volume_90d: f64,
        vwap: f64,
        high_52_week: f64,
        high_52_week_date: NaiveDate,
        low_52_week: f64,
        low_52_week_date: NaiveDate,
        change_abs: f64,
        change_pct: f64,
        change_ytd_abs: f64,
        change_ytd_pct: f64,
        pre_market_price: f64,
        pre_market_change_abs: f64,
        pre_market_change_pct: f64,
        pre_market_timestamp: DateTime<Utc>,
        after_hours_price: f64,
        after_hours_change_abs: f64,
        after_hours_change_pct: f64,
        after_hours_timestamp: DateTime<Utc>,
        is_delayed: bool,
        delay_minutes: u32,
    }
}

domain_record! {
    /// Total returns in percent; multi-year figures are annualized.
    Performance {
        total_return_1d: f64,
        total_return_5d: f64,
        total_return_1m: f64,
        total_return_3m: f64,
        total_return_6m: f64,
        total_return_ytd: f64,
        total_return_1y: f64,
        total_return_3y_annualized: f64,
        total_return_5y_annualized: f64,
        total_return_10y_annualized: f64,
        total_return_since_ipo_annualized: f64,
    }
}

domain_record! {
    TradingStats {
        shares_outstanding: f64,
        free_float_shares: f64,
        free_float_market_cap: f64,
        full_market_cap: f64,
        average_daily_value_traded_30d: f64,
        average_daily_value_traded_90d: f64,
        short_interest_shares: f64,
        short_interest_pct_float: f64,
        short_interest_days_to_cover: f64,
        short_interest_as_of_date: NaiveDate,
        lot_size: f64,
        tick_size: f64,
        trading_status: TradingStatus,
        trading_status_reason: String,
    }
}

domain_record! {
    Fundamentals {
        pe_trailing_12m: f64,
        pe_forward_12m: f64,
        peg_ratio: f64,
        price_to_sales_ttm: f64,
        price_to_sales_forward: f64,
        price_to_book: f64,
        price_to_cash_flow_ttm: f64,
        price_to_free_cash_flow_ttm: f64,
        ev_to_ebitda_ttm: f64,
        ev_to_ebit_ttm: f64,
        ev_to_sales_ttm: f64,
        eps_basic_ttm: f64,
        eps_diluted_ttm: f64,
        eps_forward_12m: f64,
        book_value_per_share: f64,
        tangible_book_value_per_share: f64,
        cash_per_share: f64,
        revenue_ttm: f64,
        revenue_most_recent_fiscal_year: f64,
        ebitda_ttm: f64,
        operating_income_ttm: f64,
        net_income_ttm: f64,
        gross_margin_pct_ttm: f64,
        operating_margin_pct_ttm: f64,
        net_margin_pct_ttm: f64,
        total_assets: f64,
        total_liabilities: f64,
        total_debt: f64,
        cash_and_equivalents: f64,
        net_debt: f64,
        debt_to_equity: f64,
        net_debt_to_ebitda: f64,
        current_ratio: f64,
        quick_ratio: f64,
        return_on_equity_pct_ttm: f64,
        return_on_assets_pct_ttm: f64,
        return_on_invested_capital_pct_ttm: f64,
        revenue_cagr_3y_pct: f64,
        revenue_cagr_5y_pct: f64,
        eps_cagr_3y_pct: f64,
        eps_cagr_5y_pct: f64,
        fiscal_year_end_month: u32,
        fiscal_year_end_day: u32,
    }
}

domain_record! {
    DividendProfile [has_dividend: bool] {
        indicated_annual_dividend_per_share: f64,
        trailing_12m_dividend_per_share: f64,
        forward_dividend_yield_pct: f64,
        trailing_12m_dividend_yield_pct: f64,
        buyback_yield_pct_ttm: f64,
        payout_ratio_earnings_pct_ttm: f64,
        payout_ratio_free_cash_flow_pct_ttm: f64,
        dividend_frequency: DividendFrequency,
        ex_dividend_date: NaiveDate,
        last_dividend_amount: f64,
        last_dividend_currency: String,
        last_dividend_declared_date: NaiveDate,
        last_dividend_payment_date: NaiveDate,
        dividend_growth_3y_cagr_pct: f64,
        dividend_growth_5y_cagr_pct: f64,
        consecutive_years_of_dividend_growth: u32,
    }
}

domain_record! {
    EarningsProfile {
        most_recent_quarter_end_date: NaiveDate,
        most_recent_report_date: NaiveDate,
        next_earnings_date: NaiveDate,
        next_earnings_session: EarningsSession,
        last_quarter_eps_actual: f64,
        last_quarter_eps_consensus: f64,
        last_quarter_eps_surprise_pct: f64,
        last_quarter_revenue_actual: f64,
        last_quarter_revenue_consensus: f64,
        last_quarter_revenue_surprise_pct: f64,
        guidance_eps_low: f64,
        guidance_eps_high: f64,
        guidance_revenue_low: f64,
        guidance_revenue_high: f64,
        guidance_fiscal_period: String,
    }
}

domain_record! {
    CorporateActions {
        last_split_date: NaiveDate,
        /// Ratio as published, e.g. "4:1"
        last_split_ratio: String,
        upcoming_split_date: NaiveDate,
        upcoming_split_ratio: String,
        last_mna_announcement_date: NaiveDate,
        last_spinoff_announcement_date: NaiveDate,
        is_spac: bool,
        is_post_spac_merged_entity: bool,
    }
}

domain_record! {
    RiskMetrics {
        beta_1y: f64,
        beta_3y: f64,
        beta_5y: f64,
        volatility_30d_pct: f64,
        volatility_90d_pct: f64,
        volatility_180d_pct: f64,
        volatility_1y_pct: f64,
        sharpe_ratio_1y: f64,
        sharpe_ratio_3y: f64,
        sharpe_ratio_5y: f64,
        max_drawdown_1y_pct: f64,
        max_drawdown_3y_pct: f64,
        value_at_risk_1d_95_pct: f64,
        value_at_risk_10d_95_pct: f64,
        expected_shortfall_1d_95_pct: f64,
    }
}

domain_record! {
    Ownership {
        insider_ownership_pct: f64,
        institutional_ownership_pct: f64,
        public_float_pct: f64,
        insider_ownership_pct_change_3m: f64,
        institutional_ownership_pct_change_3m: f64,
        number_of_institutional_holders: u32,
        top_10_institutional_ownership_pct: f64,
        net_insider_buying_usd_3m: f64,
        net_insider_buying_usd_12m: f64,
    }
}

domain_record! {
    Ratings {
        consensus_rating: AnalystConsensusRating,
        consensus_rating_score: f64,
        analyst_coverage_count: u32,
        price_target_mean: f64,
        price_target_median: f64,
        price_target_high: f64,
        price_target_low: f64,
        price_target_horizon_months: u32,
        price_target_last_updated: NaiveDate,
        implied_upside_from_last_price_pct: f64,
        credit_rating_sp: String,
        credit_rating_moodys: String,
        credit_rating_fitch: String,
        internal_rating: String,
    }
}

domain_record! {
    Esg {
        provider: String,
        esg_score_overall: f64,
        esg_score_environment: f64,
        esg_score_social: f64,
        esg_score_governance: f64,
        controversy_level: u32,
        carbon_intensity_tons_co2e_per_m_revenue: f64,
        fossil_fuel_exposure_pct_revenue: f64,
        weapons_exposure_pct_revenue: f64,
    }
}

/// The independently fetched slices that make up a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Domain {
    Identity,
    Classification,
    Quote,
    Performance,
    TradingStats,
    Fundamentals,
    DividendProfile,
    Earnings,
    CorporateActions,
    Risk,
    Ownership,
    Ratings,
    Esg,
}

impl Domain {
    pub const ALL: [Domain; 13] = [
        Domain::Identity,
        Domain::Classification,
        Domain::Quote,
        Domain::Performance,
        Domain::TradingStats,
        Domain::Fundamentals,
        Domain::DividendProfile,
        Domain::Earnings,
        Domain::CorporateActions,
        Domain::Risk,
        Domain::Ownership,
        Domain::Ratings,
        Domain::Esg,
    ];

    /// Name used for storage keys and the wire format.
    pub fn key(&self) -> &'static str {
        match self {
            Domain::Identity => "identity",
            Domain::Classification => "classification",
            Domain::Quote => "quote",
            Domain::Performance => "performance",
            Domain::TradingStats => "tradingStats",
            Domain::Fundamentals => "fundamentals",
            Domain::DividendProfile => "dividendProfile",
            Domain::Earnings => "earnings",
            Domain::CorporateActions => "corporateActions",
            Domain::Risk => "risk",
            Domain::Ownership => "ownership",
            Domain::Ratings => "ratings",
            Domain::Esg => "esg",
        }
    }

    /// Primary sections are expected on every snapshot; ESG is not.
    pub fn is_primary(&self) -> bool {
        !matches!(self, Domain::Esg)
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Domain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|d| d.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("Unknown domain: {}", s))
    }
}

/// A record as persisted upstream: an untyped payload plus the time the
/// upstream last modified it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub data: serde_json::Value,
}

impl StoredRecord {
    pub fn new<T: Serialize>(record: &T, updated_at: Option<DateTime<Utc>>) -> anyhow::Result<Self> {
        Ok(Self {
            updated_at,
            data: serde_json::to_value(record)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names_follow_camel_case() {
        let quote = Quote {
            last: 120.5,
            last_timestamp: "2026-10-16T20:00:00Z".parse().unwrap(),
            high_52_week: Some(150.0),
            average_volume_10d: Some(1_000_000.0),
            ..quote_defaults()
        };
        let value = serde_json::to_value(&quote).unwrap();
        assert_eq!(value["high52Week"], json!(150.0));
        assert_eq!(value["averageVolume10d"], json!(1_000_000.0));
        assert_eq!(value["lastTimestamp"], json!("2026-10-16T20:00:00Z"));
        assert!(value.get("open").is_none());

        let risk = RiskMetrics {
            value_at_risk_1d_95_pct: Some(2.1),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&risk).unwrap(),
            json!({"valueAtRisk1d95Pct": 2.1})
        );
    }

    #[test]
    fn test_enums_use_screaming_snake_case() {
        let earnings: EarningsProfile = serde_json::from_value(json!({
            "nextEarningsSession": "DURING_SESSION",
            "nextEarningsDate": "2026-11-19"
        }))
        .unwrap();
        assert_eq!(earnings.next_earnings_session, Some(EarningsSession::DuringSession));
        assert_eq!(
            earnings.next_earnings_date,
            NaiveDate::from_ymd_opt(2026, 11, 19)
        );
        assert_eq!(
            serde_json::to_value(AnalystConsensusRating::StrongBuy).unwrap(),
            json!("STRONG_BUY")
        );
    }

    #[test]
    fn test_mistyped_fields_are_rejected() {
        let result: Result<Fundamentals, _> =
            serde_json::from_value(json!({"peTrailing12m": "cheap"}));
        assert!(result.is_err());

        let result: Result<Quote, _> = serde_json::from_value(json!({"open": 1.0}));
        assert!(result.is_err(), "quote without last price must not decode");
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let ownership: Ownership =
            serde_json::from_value(json!({"publicFloatPct": 80.0, "legacyColumn": 1})).unwrap();
        assert_eq!(
            serde_json::to_value(&ownership).unwrap(),
            json!({"publicFloatPct": 80.0})
        );
    }

    #[test]
    fn test_domain_keys_round_trip() {
        for domain in Domain::ALL {
            assert_eq!(domain.key().parse::<Domain>().unwrap(), domain);
            assert_eq!(serde_json::to_value(domain).unwrap(), json!(domain.key()));
        }
        assert!(!Domain::Esg.is_primary());
        assert!(Domain::Quote.is_primary());
        assert!("nonsense".parse::<Domain>().is_err());
    }

    fn quote_defaults() -> Quote {
        serde_json::from_value(json!({
            "last": 0.0,
            "lastTimestamp": "1970-01-01T00:00:00Z"
        }))
        .unwrap()
    }
}
