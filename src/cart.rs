//! Shopping carts returned by suppliers, as stored by the backend.
//!
//! - OCI carts come back as HTML form fields (`NEW_ITEM-PRICE[1]`, ...); the
//!   backend groups them into columns: `{ "NEW_ITEM-PRICE": ["9.99", ...] }`.
//! - cXML carts come back as a `PunchOutOrderMessage`; the backend returns
//!   the raw XML plus an xml2js-style JSON tree (`$` for attributes, `_` for
//!   text, every child wrapped in an array).
//!
//! Both are summarized into item rows and a cart total on the client.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::client::BackendClient;
use crate::error::{PunchoutError, Result};

/// Column-name prefix used by every OCI item field.
pub const OCI_ITEM_PREFIX: &str = "NEW_ITEM-";

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_number(text: &str) -> f64 {
    text.trim().parse().unwrap_or(0.0)
}

// ── OCI ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OciCartEnvelope {
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

/// An OCI cart: named columns with one cell per item.
#[derive(Debug, Clone, PartialEq)]
pub struct OciCart {
    columns: Vec<(String, Vec<String>)>,
}

impl OciCart {
    /// Builds a cart from the backend's column map, keeping its key order.
    /// Scalar columns count as a single cell.
    pub fn from_columns(data: Map<String, Value>) -> Self {
        let columns = data
            .into_iter()
            .map(|(name, cells)| {
                let cells = match cells {
                    Value::Array(items) => items.iter().map(cell_text).collect(),
                    scalar => vec![cell_text(&scalar)],
                };
                (name, cells)
            })
            .collect();
        OciCart { columns }
    }

    fn column(&self, name: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, cells)| cells.as_slice())
    }

    /// Column names without the `NEW_ITEM-` prefix.
    pub fn headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|(name, _)| name.strip_prefix(OCI_ITEM_PREFIX).unwrap_or(name).to_string())
            .collect()
    }

    /// Number of items, taken from the first column.
    pub fn item_count(&self) -> usize {
        self.columns.first().map_or(0, |(_, cells)| cells.len())
    }

    /// One row per item; missing or empty cells read `N/A`.
    pub fn rows(&self) -> Vec<Vec<String>> {
        (0..self.item_count())
            .map(|item| {
                self.columns
                    .iter()
                    .map(|(_, cells)| match cells.get(item) {
                        Some(cell) if !cell.is_empty() => cell.clone(),
                        _ => "N/A".to_string(),
                    })
                    .collect()
            })
            .collect()
    }

    /// Σ price × quantity over all items; 0 when either column is missing.
    pub fn total(&self) -> f64 {
        let (Some(prices), Some(quantities)) = (
            self.column("NEW_ITEM-PRICE"),
            self.column("NEW_ITEM-QUANTITY"),
        ) else {
            return 0.0;
        };
        prices
            .iter()
            .enumerate()
            .map(|(i, price)| {
                let quantity = quantities.get(i).map_or(0.0, |q| parse_number(q));
                parse_number(price) * quantity
            })
            .sum()
    }

    /// Currency of the first item, if the supplier sent one.
    pub fn currency(&self) -> Option<&str> {
        self.column("NEW_ITEM-CURRENCY")
            .and_then(|cells| cells.first())
            .map(String::as_str)
    }
}

/// Fetches the OCI cart stored under `cart_id`. `Ok(None)` means the backend
/// has no data for it.
pub async fn get_oci_cart(client: &BackendClient, cart_id: &str) -> Result<Option<OciCart>> {
    let envelope: OciCartEnvelope = client.get(&format!("api/oci-data/{cart_id}")).await?;
    Ok(envelope
        .data
        .filter(|data| !data.is_empty())
        .map(OciCart::from_columns))
}

// ── cXML ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CxmlCartEnvelope {
    #[serde(default)]
    xml: Option<String>,
    #[serde(default)]
    json: Option<Value>,
}

/// One `ItemIn` line of a `PunchOutOrderMessage`.
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    /// Item description text.
    pub description: String,
    /// Supplier's part number.
    pub supplier_part_id: String,
    /// Ordered quantity; unparsable values read as 0.
    pub quantity: f64,
    /// Price per unit in the cart currency.
    pub unit_price: f64,
    /// UN/CEFACT unit code, e.g. `EA`.
    pub unit_of_measure: String,
    /// UNSPSC (or other) classification code.
    pub classification: String,
}

impl CartItem {
    /// Quantity × unit price.
    pub fn line_total(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// Header and item data extracted from a cXML order message.
#[derive(Debug, Clone, PartialEq)]
pub struct CxmlCartSummary {
    /// Credential domain of the `From` party.
    pub supplier_domain: String,
    /// Credential identity of the `From` party.
    pub supplier_identity: String,
    /// Credential domain of the `To` party.
    pub buyer_domain: String,
    /// Credential identity of the `To` party.
    pub buyer_identity: String,
    /// Credential identity of the `Sender`.
    pub sender_identity: String,
    /// `UserAgent` of the sender.
    pub user_agent: String,
    /// `payloadID` of the order message.
    pub payload_id: String,
    /// Document timestamp.
    pub timestamp: String,
    /// Currency of the order total.
    pub currency: String,
    /// `ItemIn` lines in document order.
    pub items: Vec<CartItem>,
}

/// A cXML cart: the raw document plus its summary.
#[derive(Debug, Clone)]
pub struct CxmlCart {
    /// The order message as received.
    pub xml: String,
    /// xml2js rendering of `xml`.
    pub tree: Value,
    /// Header and item data read from `tree`.
    pub summary: CxmlCartSummary,
}

/// Text of an xml2js node: a bare string, or the `_` member of an object.
fn node_text(node: Option<&Value>) -> String {
    match node {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(map)) => map.get("_").map(cell_text).unwrap_or_default(),
        Some(Value::Array(items)) => node_text(items.first()),
        Some(other) => cell_text(other),
        None => String::new(),
    }
}

fn text_at(root: &Value, pointer: &str) -> String {
    node_text(root.pointer(pointer))
}

impl CxmlCartSummary {
    /// Reads the summary out of an xml2js tree rooted at `{ "cXML": ... }`.
    pub fn from_tree(tree: &Value) -> Result<Self> {
        let root = tree
            .get("cXML")
            .ok_or_else(|| PunchoutError::Backend("cart data has no cXML root".to_string()))?;
        let message = root
            .pointer("/Message/0/PunchOutOrderMessage/0")
            .ok_or_else(|| {
                PunchoutError::Backend("cart data has no PunchOutOrderMessage".to_string())
            })?;

        let items = message
            .get("ItemIn")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(CartItem::from_node).collect())
            .unwrap_or_default();

        Ok(CxmlCartSummary {
            supplier_domain: text_at(root, "/Header/0/From/0/Credential/0/$/domain"),
            supplier_identity: text_at(root, "/Header/0/From/0/Credential/0/Identity/0"),
            buyer_domain: text_at(root, "/Header/0/To/0/Credential/0/$/domain"),
            buyer_identity: text_at(root, "/Header/0/To/0/Credential/0/Identity/0"),
            sender_identity: text_at(root, "/Header/0/Sender/0/Credential/0/Identity/0"),
            user_agent: text_at(root, "/Header/0/Sender/0/UserAgent/0"),
            payload_id: text_at(root, "/$/payloadID"),
            timestamp: text_at(root, "/$/timestamp"),
            currency: text_at(
                message,
                "/PunchOutOrderMessageHeader/0/Total/0/Money/0/$/currency",
            ),
            items,
        })
    }

    /// Sum of all line totals.
    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }
}

impl CartItem {
    fn from_node(item: &Value) -> Self {
        CartItem {
            description: text_at(item, "/ItemDetail/0/Description/0"),
            supplier_part_id: text_at(item, "/ItemID/0/SupplierPartID/0"),
            quantity: parse_number(&text_at(item, "/$/quantity")),
            unit_price: parse_number(&text_at(item, "/ItemDetail/0/UnitPrice/0/Money/0")),
            unit_of_measure: text_at(item, "/ItemDetail/0/UnitOfMeasure/0"),
            classification: text_at(item, "/ItemDetail/0/Classification/0"),
        }
    }
}

/// Fetches the cXML cart stored under `doc_id`. `Ok(None)` means the
/// backend has no data for it.
pub async fn get_cxml_cart(client: &BackendClient, doc_id: &str) -> Result<Option<CxmlCart>> {
    let envelope: CxmlCartEnvelope = client.get(&format!("api/cxml-data/{doc_id}")).await?;
    let (Some(xml), Some(tree)) = (envelope.xml, envelope.json) else {
        return Ok(None);
    };
    let summary = CxmlCartSummary::from_tree(&tree)?;
    Ok(Some(CxmlCart { xml, tree, summary }))
}
