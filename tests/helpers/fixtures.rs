/// Raw-record fixtures and mock-upstream helpers shared by the suite.
use serde_json::json;
use trade_intel_ops::domain::RawRecord;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// An Indian export line with a direct FOB USD price.
pub fn fob_export_raw(declaration: &str) -> RawRecord {
    RawRecord::from_value(json!({
        "DECLARATION_NO": declaration,
        "ITEM_NO": "1",
        "FOB_USD": 1_500_000,
        "QUANTITY": 1000,
        "UNIT": "MTS",
        "HS_CODE": 8013100,
        "EXP_DATE": "2025-03-10T00:00:00Z",
        "CONSIGNOR": "SUNRISE EXPORTS",
        "FOREIGN_PORT": "HO CHI MINH",
        "INDIAN_PORT": "TUTICORIN",
        "PRODUCT": "RAW CASHEW NUTS IN SHELL OUTTURN 46 LBS",
    }))
}

/// A CIF import line that needs the freight/insurance/port deduction.
pub fn cif_import_raw(declaration: &str) -> RawRecord {
    RawRecord::from_value(json!({
        "DECLARATION_NO": declaration,
        "ITEM_NO": "1",
        "TOTAL_ASSESS_USD": 1_600_000,
        "QUANTITY": 1000,
        "UNIT": "MTS",
        "HS_CODE": "08013100",
        "ORIGIN_COUNTRY": "IVORY COAST",
        "PORT_OF_SHIPMENT": "ABIDJAN",
        "INDIAN_PORT": "TUTICORIN",
        "IMP_DATE": "2025-04-02",
        "CONSIGNEE": "OLAM AGRI INDIA",
        "PRODUCT": "RAW CASHEW NUTS OUTTURN 48 LBS",
    }))
}

/// Mount the OAuth token endpoint on a mock upstream.
pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "AccessToken": "fixture-token" })),
        )
        .mount(server)
        .await;
}

/// Mount a one-page shipment response carrying the given rows.
pub async fn mount_shipment_page(server: &MockServer, rows: Vec<serde_json::Value>) {
    let total = rows.len();
    Mock::given(method("POST"))
        .and(path("/trade/shipment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": rows,
            "total_search_records": total,
        })))
        .mount(server)
        .await;
}
