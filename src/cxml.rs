//! cXML `PunchOutSetupRequest` construction and parsing.
//!
//! [`SetupRequestForm`] holds the editable fields of a setup request. It
//! renders them into a cXML 1.2.014 document ([`SetupRequestForm::to_payload`])
//! and can be repopulated from a pasted document
//! ([`SetupRequestForm::parse_pasted`]). The supplier's setup response is
//! reduced to its start-page URL by [`extract_start_page_url`].

use chrono::Utc;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rand::Rng;

use crate::error::{PunchoutError, Result};

/// Suffix appended to generated payload IDs.
pub const PAYLOAD_ID_DOMAIN: &str = "@PunchoutTesttool.com";

/// Path on the backend that receives the `PunchOutOrderMessage`.
pub const BUYER_RETURN_PATH: &str = "/api/cxml-data";

/// Generates a 15-digit payload ID with the tool's domain suffix.
pub fn generate_payload_id() -> String {
    let mut rng = rand::rng();
    let digits: String = (0..15)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect();
    format!("{digits}{PAYLOAD_ID_DOMAIN}")
}

/// Current UTC time as an ISO 8601 timestamp with an explicit `+00:00` offset.
pub fn generate_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3f+00:00").to_string()
}

/// Editable fields of a cXML punchout setup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupRequestForm {
    /// `From` credential domain.
    pub from_domain: String,
    /// `From` credential identity.
    pub from_identity: String,
    /// `To` credential domain.
    pub to_domain: String,
    /// `To` credential identity.
    pub to_identity: String,
    /// `Sender` credential domain.
    pub sender_domain: String,
    /// `Sender` credential identity.
    pub sender_identity: String,
    /// `Sender` shared secret.
    pub shared_secret: String,
    /// `payloadID` attribute of the document.
    pub payload_id: String,
    /// Document timestamp.
    pub timestamp: String,
    /// Supplier setup endpoint the request is sent to.
    pub supplier_url: String,
    /// Where the supplier posts the cart back. Survives resets and pastes.
    pub buyer_url: String,
    /// `Extrinsic name="User"`.
    pub extrinsic_user: String,
    /// `Extrinsic name="UniqueName"`.
    pub extrinsic_username: String,
    /// `Extrinsic name="UserEmail"`.
    pub extrinsic_email: String,
}

impl SetupRequestForm {
    /// A form with placeholder credentials and a fresh payload ID and
    /// timestamp. `backend_url` is the base of the buyer return URL.
    pub fn new(backend_url: &str) -> Self {
        SetupRequestForm::defaults(format!(
            "{}{BUYER_RETURN_PATH}",
            backend_url.trim_end_matches('/')
        ))
    }

    fn defaults(buyer_url: String) -> Self {
        SetupRequestForm {
            from_domain: "Network Id".to_string(),
            from_identity: "Buyer Identity".to_string(),
            to_domain: "DUNS".to_string(),
            to_identity: "Supplier Identity".to_string(),
            sender_domain: "Network User Id".to_string(),
            sender_identity: "Username".to_string(),
            shared_secret: "Password".to_string(),
            payload_id: generate_payload_id(),
            timestamp: generate_timestamp(),
            supplier_url: String::new(),
            buyer_url,
            extrinsic_user: "PunchoutTestTool".to_string(),
            extrinsic_username: "PunchoutTestTool".to_string(),
            extrinsic_email: "punchout.user@punchottesttool.com".to_string(),
        }
    }

    /// Restores the defaults with a new payload ID and timestamp, keeping
    /// the buyer URL.
    pub fn reset(&mut self) {
        *self = SetupRequestForm::defaults(std::mem::take(&mut self.buyer_url));
    }

    /// Renders the setup request document. All field values are escaped.
    pub fn to_payload(&self) -> String {
        let e = |value: &str| escape(value).into_owned();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE cXML SYSTEM "http://xml.cxml.org/schemas/cXML/1.2.014/cXML.dtd">
<cXML xml:lang="en-US" payloadID="{payload_id}" timestamp="{timestamp}">
  <Header>
    <From>
      <Credential domain="{from_domain}">
        <Identity>{from_identity}</Identity>
      </Credential>
    </From>
    <To>
      <Credential domain="{to_domain}">
        <Identity>{to_identity}</Identity>
      </Credential>
    </To>
    <Sender>
      <Credential domain="{sender_domain}">
        <Identity>{sender_identity}</Identity>
        <SharedSecret>{shared_secret}</SharedSecret>
      </Credential>
      <UserAgent>Coupa Procurement 1.0</UserAgent>
    </Sender>
  </Header>
  <Request>
    <PunchOutSetupRequest operation="create">
      <BuyerCookie>99ea3c4c8cf9f6dc905a6b6772daa0d1</BuyerCookie>
      <Extrinsic name="FirstName">Punchout</Extrinsic>
      <Extrinsic name="LastName">Tester</Extrinsic>
      <Extrinsic name="UniqueName">{extrinsic_username}</Extrinsic>
      <Extrinsic name="User">{extrinsic_user}</Extrinsic>
      <Extrinsic name="UserEmail">{extrinsic_email}</Extrinsic>
      <BrowserFormPost>
        <URL>{buyer_url}</URL>
      </BrowserFormPost>
      <Contact role="endUser">
        <Name xml:lang="en-US">{extrinsic_user}</Name>
        <Email>{extrinsic_email}</Email>
      </Contact>
      <SupplierSetup>
        <URL>{supplier_url}</URL>
      </SupplierSetup>
      <ShipTo>
        <Address>
          <Name xml:lang="en">Optional</Name>
          <PostalAddress>
            <DeliverTo>Optional</DeliverTo>
            <Street>1301 Dove</Street>
            <City>Newport Beach</City>
            <State>CA</State>
            <PostalCode>92660</PostalCode>
            <Country isoCountryCode="US">US</Country>
          </PostalAddress>
          <Phone name="work">
            <TelephoneNumber>
              <CountryCode isoCountryCode="US">+1</CountryCode>
              <AreaOrCityCode>949</AreaOrCityCode>
              <Number>5677100</Number>
            </TelephoneNumber>
          </Phone>
        </Address>
      </ShipTo>
    </PunchOutSetupRequest>
  </Request>
</cXML>"#,
            payload_id = e(&self.payload_id),
            timestamp = e(&self.timestamp),
            from_domain = e(&self.from_domain),
            from_identity = e(&self.from_identity),
            to_domain = e(&self.to_domain),
            to_identity = e(&self.to_identity),
            sender_domain = e(&self.sender_domain),
            sender_identity = e(&self.sender_identity),
            shared_secret = e(&self.shared_secret),
            extrinsic_username = e(&self.extrinsic_username),
            extrinsic_user = e(&self.extrinsic_user),
            extrinsic_email = e(&self.extrinsic_email),
            buyer_url = e(&self.buyer_url),
            supplier_url = e(self.supplier_url.trim()),
        )
    }

    /// Builds a form from a pasted setup request.
    ///
    /// Every field is read from the document; elements that are missing
    /// become empty strings. `buyer_url` is kept as given rather than taken
    /// from the document.
    pub fn parse_pasted(xml: &str, buyer_url: &str) -> Result<Self> {
        let fields = PastedFields::read(xml)?;
        Ok(SetupRequestForm {
            from_domain: fields.from_domain.unwrap_or_default(),
            from_identity: fields.from_identity.unwrap_or_default(),
            to_domain: fields.to_domain.unwrap_or_default(),
            to_identity: fields.to_identity.unwrap_or_default(),
            sender_domain: fields.sender_domain.unwrap_or_default(),
            sender_identity: fields.sender_identity.unwrap_or_default(),
            shared_secret: fields.shared_secret.unwrap_or_default(),
            payload_id: fields.payload_id.unwrap_or_default(),
            timestamp: fields.timestamp.unwrap_or_default(),
            supplier_url: fields.supplier_url.unwrap_or_default(),
            buyer_url: buyer_url.to_string(),
            extrinsic_user: fields.extrinsic_user.unwrap_or_default(),
            extrinsic_username: fields.extrinsic_username.unwrap_or_default(),
            extrinsic_email: fields.extrinsic_email.unwrap_or_default(),
        })
    }
}

/// First occurrence of each field, in document order.
#[derive(Default)]
struct PastedFields {
    seen_root: bool,
    payload_id: Option<String>,
    timestamp: Option<String>,
    from_domain: Option<String>,
    from_identity: Option<String>,
    to_domain: Option<String>,
    to_identity: Option<String>,
    sender_domain: Option<String>,
    sender_identity: Option<String>,
    shared_secret: Option<String>,
    supplier_url: Option<String>,
    extrinsic_user: Option<String>,
    extrinsic_username: Option<String>,
    extrinsic_email: Option<String>,
}

struct OpenElement {
    name: String,
    extrinsic_name: Option<String>,
}

fn ends_with(stack: &[OpenElement], path: &[&str]) -> bool {
    stack.len() >= path.len()
        && stack[stack.len() - path.len()..]
            .iter()
            .zip(path)
            .all(|(open, name)| open.name == *name)
}

fn set_once(slot: &mut Option<String>, value: impl FnOnce() -> String) {
    if slot.is_none() {
        *slot = Some(value());
    }
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match element
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?
    {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

impl PastedFields {
    fn read(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut fields = PastedFields::default();
        let mut stack: Vec<OpenElement> = Vec::new();
        let mut text = String::new();

        loop {
            match reader.read_event()? {
                Event::Start(element) => {
                    let open = fields.open(&stack, &element)?;
                    stack.push(open);
                    text.clear();
                }
                Event::Empty(element) => {
                    let open = fields.open(&stack, &element)?;
                    stack.push(open);
                    fields.close(&stack, "");
                    stack.pop();
                }
                Event::Text(chunk) => text.push_str(&chunk.unescape()?),
                Event::CData(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
                Event::End(_) => {
                    fields.close(&stack, text.trim());
                    stack.pop();
                    text.clear();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !fields.seen_root {
            return Err(PunchoutError::Validation(
                "The pasted text is not a cXML document.".to_string(),
            ));
        }
        Ok(fields)
    }

    fn open(&mut self, stack: &[OpenElement], element: &BytesStart<'_>) -> Result<OpenElement> {
        let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
        let parent = stack.last().map(|open| open.name.as_str());

        match (parent, name.as_str()) {
            (_, "cXML") if !self.seen_root => {
                self.seen_root = true;
                self.payload_id = attribute(element, "payloadID")?;
                self.timestamp = attribute(element, "timestamp")?;
            }
            (Some("From"), "Credential") if self.from_domain.is_none() => {
                self.from_domain = Some(attribute(element, "domain")?.unwrap_or_default());
            }
            (Some("To"), "Credential") if self.to_domain.is_none() => {
                self.to_domain = Some(attribute(element, "domain")?.unwrap_or_default());
            }
            (Some("Sender"), "Credential") if self.sender_domain.is_none() => {
                self.sender_domain = Some(attribute(element, "domain")?.unwrap_or_default());
            }
            _ => {}
        }

        let extrinsic_name = if name == "Extrinsic" {
            attribute(element, "name")?
        } else {
            None
        };
        Ok(OpenElement {
            name,
            extrinsic_name,
        })
    }

    fn close(&mut self, stack: &[OpenElement], text: &str) {
        let text = || text.to_string();
        if ends_with(stack, &["From", "Credential", "Identity"]) {
            set_once(&mut self.from_identity, text);
        } else if ends_with(stack, &["To", "Credential", "Identity"]) {
            set_once(&mut self.to_identity, text);
        } else if ends_with(stack, &["Sender", "Credential", "Identity"]) {
            set_once(&mut self.sender_identity, text);
        } else if ends_with(stack, &["Sender", "Credential", "SharedSecret"]) {
            set_once(&mut self.shared_secret, text);
        } else if ends_with(stack, &["SupplierSetup", "URL"]) {
            set_once(&mut self.supplier_url, text);
        } else if let Some(open) = stack.last().filter(|open| open.name == "Extrinsic") {
            match open.extrinsic_name.as_deref() {
                Some("User") => set_once(&mut self.extrinsic_user, text),
                Some("UniqueName") => set_once(&mut self.extrinsic_username, text),
                Some("UserEmail") => set_once(&mut self.extrinsic_email, text),
                _ => {}
            }
        }
    }
}

/// Pulls the start-page URL out of a `PunchOutSetupResponse`.
///
/// Returns the text of the first `<URL>` element with `&amp;` decoded, or
/// `None` when the response carries no URL.
pub fn extract_start_page_url(response: &str) -> Option<String> {
    let start = response.find("<URL>")? + "<URL>".len();
    let len = response[start..].find("</URL>")?;
    let url = response[start..start + len].trim();
    (!url.is_empty()).then(|| url.replace("&amp;", "&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_id_is_fifteen_digits_with_suffix() {
        let id = generate_payload_id();
        let digits = id.strip_suffix(PAYLOAD_ID_DOMAIN).unwrap();
        assert_eq!(digits.len(), 15);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn timestamp_uses_explicit_utc_offset() {
        let ts = generate_timestamp();
        assert!(ts.ends_with("+00:00"), "got {ts}");
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn new_form_points_buyer_url_at_backend() {
        let form = SetupRequestForm::new("https://backend.test/");
        assert_eq!(form.buyer_url, "https://backend.test/api/cxml-data");
        assert_eq!(form.to_domain, "DUNS");
        assert!(form.supplier_url.is_empty());
    }

    #[test]
    fn reset_keeps_buyer_url_and_renews_payload_id() {
        let mut form = SetupRequestForm::new("https://backend.test");
        form.payload_id = "fixed".to_string();
        form.supplier_url = "https://supplier.test/setup".to_string();
        form.reset();
        assert_eq!(form.buyer_url, "https://backend.test/api/cxml-data");
        assert_ne!(form.payload_id, "fixed");
        assert!(form.supplier_url.is_empty());
    }

    #[test]
    fn payload_escapes_field_values() {
        let mut form = SetupRequestForm::new("https://backend.test");
        form.shared_secret = "a<b&c".to_string();
        form.supplier_url = "https://supplier.test/setup?x=1&y=2".to_string();
        let payload = form.to_payload();
        assert!(payload.contains("<SharedSecret>a&lt;b&amp;c</SharedSecret>"));
        assert!(payload.contains("<URL>https://supplier.test/setup?x=1&amp;y=2</URL>"));
    }

    #[test]
    fn rendered_payload_parses_back_into_the_same_form() {
        let mut form = SetupRequestForm::new("https://backend.test");
        form.from_identity = "AN0100".to_string();
        form.sender_identity = "buyer@corp".to_string();
        form.shared_secret = "s3cr&t".to_string();
        form.supplier_url = "https://supplier.test/setup?x=1&y=2".to_string();

        let parsed =
            SetupRequestForm::parse_pasted(&form.to_payload(), &form.buyer_url).unwrap();
        assert_eq!(parsed, form);
    }

    #[test]
    fn pasted_document_with_missing_elements_yields_empty_fields() {
        let xml = r#"<?xml version="1.0"?>
            <cXML payloadID="123@x" timestamp="2024-01-01T00:00:00+00:00">
              <Header>
                <From><Credential domain="NetworkId"><Identity>AN01</Identity></Credential></From>
              </Header>
              <Request>
                <PunchOutSetupRequest operation="create">
                  <Extrinsic name="UserEmail">jane@corp.test</Extrinsic>
                  <SupplierSetup><URL>https://supplier.test/po</URL></SupplierSetup>
                </PunchOutSetupRequest>
              </Request>
            </cXML>"#;
        let form = SetupRequestForm::parse_pasted(xml, "https://keep.test").unwrap();
        assert_eq!(form.payload_id, "123@x");
        assert_eq!(form.from_domain, "NetworkId");
        assert_eq!(form.from_identity, "AN01");
        assert_eq!(form.to_domain, "");
        assert_eq!(form.shared_secret, "");
        assert_eq!(form.extrinsic_email, "jane@corp.test");
        assert_eq!(form.extrinsic_user, "");
        assert_eq!(form.supplier_url, "https://supplier.test/po");
        assert_eq!(form.buyer_url, "https://keep.test");
    }

    #[test]
    fn pasted_non_cxml_is_rejected() {
        assert!(SetupRequestForm::parse_pasted("just some text", "").is_err());
        assert!(SetupRequestForm::parse_pasted("<cXML><Header></From></cXML>", "").is_err());
    }

    #[test]
    fn start_page_url_is_extracted_and_decoded() {
        let response = r#"<cXML><Response><Status code="200"/>
            <PunchOutSetupResponse><StartPage>
            <URL>https://supplier.test/start?sid=1&amp;lang=en</URL>
            </StartPage></PunchOutSetupResponse></Response></cXML>"#;
        assert_eq!(
            extract_start_page_url(response).as_deref(),
            Some("https://supplier.test/start?sid=1&lang=en")
        );
        assert_eq!(extract_start_page_url("<cXML/>"), None);
        assert_eq!(extract_start_page_url("<URL></URL>"), None);
    }
}
