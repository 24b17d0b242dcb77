/// Builder for canonical shipments with sensible defaults, so tests state
/// only the fields they care about.
use chrono::{NaiveDate, Utc};
use trade_intel_ops::domain::shipment::NORMALIZATION_VERSION;
use trade_intel_ops::domain::{
    CanonicalShipment, Incoterm, PriceSource, PriceStatus, QualityEstimate, TradeType, UnitStatus,
};

pub struct ShipmentBuilder {
    record_id: String,
    trade_date: Option<NaiveDate>,
    trade_type: TradeType,
    trade_country: String,
    consignee: Option<String>,
    consignor: Option<String>,
    origin_country: Option<String>,
    hct_id: Option<String>,
    hct_name: String,
    quantity_mt: Option<f64>,
    fob_usd_total: Option<f64>,
    price_status: PriceStatus,
    grade: String,
}

impl Default for ShipmentBuilder {
    fn default() -> Self {
        Self {
            record_id: format!("D-{}", uuid_suffix()),
            trade_date: NaiveDate::from_ymd_opt(2025, 4, 1),
            trade_type: TradeType::Import,
            trade_country: "INDIA".to_string(),
            consignee: None,
            consignor: None,
            origin_country: Some("IVORY COAST".to_string()),
            hct_id: Some("HCT-0801-RCN-INSHELL".to_string()),
            hct_name: "Raw Cashew Nuts (In Shell)".to_string(),
            quantity_mt: Some(100.0),
            fob_usd_total: Some(150_000.0),
            price_status: PriceStatus::Normal,
            grade: "Standard".to_string(),
        }
    }
}

fn uuid_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

impl ShipmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = record_id.into();
        self
    }

    pub fn trade_date(mut self, year: i32, month: u32, day: u32) -> Self {
        self.trade_date = NaiveDate::from_ymd_opt(year, month, day);
        self
    }

    pub fn trade_type(mut self, trade_type: TradeType) -> Self {
        self.trade_type = trade_type;
        self
    }

    pub fn consignee(mut self, name: impl Into<String>) -> Self {
        self.consignee = Some(name.into());
        self
    }

    pub fn consignor(mut self, name: impl Into<String>) -> Self {
        self.consignor = Some(name.into());
        self
    }

    pub fn origin(mut self, country: impl Into<String>) -> Self {
        self.origin_country = Some(country.into());
        self
    }

    pub fn commodity(mut self, hct_id: impl Into<String>, hct_name: impl Into<String>) -> Self {
        self.hct_id = Some(hct_id.into());
        self.hct_name = hct_name.into();
        self
    }

    pub fn quantity_mt(mut self, qty: f64) -> Self {
        self.quantity_mt = Some(qty);
        self
    }

    pub fn price_per_mt(mut self, price: f64) -> Self {
        let qty = self.quantity_mt.unwrap_or(1.0);
        self.fob_usd_total = Some(price * qty);
        self
    }

    pub fn price_status(mut self, status: PriceStatus) -> Self {
        self.price_status = status;
        self
    }

    pub fn grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = grade.into();
        self
    }

    pub fn build(self) -> CanonicalShipment {
        let fob_usd_per_mt = match (self.fob_usd_total, self.quantity_mt) {
            (Some(total), Some(qty)) if qty > 0.0 => Some(total / qty),
            _ => None,
        };
        CanonicalShipment {
            record_id: self.record_id,
            declaration_no: None,
            bill_no: None,
            trade_date: self.trade_date,
            trade_type: self.trade_type,
            trade_country: self.trade_country,
            consignee: self.consignee,
            consignor: self.consignor,
            origin_country: self.origin_country,
            origin_port: None,
            destination_country: None,
            destination_port: None,
            hs_code: "08013100".to_string(),
            hs_code_2: Some("08".to_string()),
            hs_code_4: Some("0801".to_string()),
            hct_id: self.hct_id,
            hct_name: self.hct_name,
            hct_group: "Cashew Complex".to_string(),
            product_description: String::new(),
            quantity_mt: self.quantity_mt,
            quantity_original: self.quantity_mt,
            unit_original: Some("MT".to_string()),
            unit_status: UnitStatus::Ok,
            fob_usd_total: self.fob_usd_total,
            fob_usd_per_mt,
            declared_incoterm: Incoterm::Cif,
            price_source: PriceSource::DerivedFromCif,
            price_status: self.price_status,
            currency_original: None,
            quality_estimate: QualityEstimate {
                grade: self.grade,
                confidence: 0.5,
                signals_used: Vec::new(),
                details: String::new(),
            },
            freight_deducted: None,
            insurance_deducted: None,
            port_charges_deducted: None,
            normalized_at: Utc::now(),
            normalization_version: NORMALIZATION_VERSION.to_string(),
        }
    }
}
