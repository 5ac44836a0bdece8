// Catalog ingestion: backend JSON, supplier XML and AvailRQ search requests
use chrono::NaiveDate;
use quick_xml::de::from_str;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::SearchCatalog;
use crate::supplier::SupplierCatalogResponse;
use crate::xml_response::XmlAvailResponse;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("XML parse error: {0}")]
    XmlParseError(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Parameters of the search a supplier feed answers.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchContext {
    pub search_id: String,
    pub currency: String,
    pub nationality: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl SearchContext {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate, currency: impl Into<String>) -> Self {
        Self {
            search_id: format!("search-{}", rand::random::<u32>()),
            currency: currency.into(),
            nationality: String::new(),
            check_in,
            check_out,
        }
    }
}

#[derive(Debug, Default)]
pub struct CatalogProcessor {}

impl CatalogProcessor {
    pub fn new() -> Self {
        Self {}
    }

    /// Parses the backend's JSON availability payload for one hotel.
    pub fn process_json(&self, json: &str) -> Result<SearchCatalog, ProcessingError> {
        let response: SupplierCatalogResponse =
            serde_json::from_str(json).map_err(|e| ProcessingError::JsonParseError(e.to_string()))?;

        check_stay(response.check_in, response.check_out)?;

        let catalog: SearchCatalog = response.into();
        report_dangling_rates(&catalog);
        Ok(catalog)
    }

    /// Parses a supplier AvailRS feed into one catalog per hotel.
    pub fn process_xml(
        &self,
        xml: &str,
        context: &SearchContext,
    ) -> Result<Vec<SearchCatalog>, ProcessingError> {
        check_stay(context.check_in, context.check_out)?;

        let response: XmlAvailResponse =
            from_str(xml).map_err(|e| ProcessingError::XmlParseError(e.to_string()))?;

        let catalogs = response.into_catalogs(context);
        for catalog in &catalogs {
            debug!(
                hotel_id = %catalog.hotel_id,
                rooms = catalog.rooms.len(),
                recommendations = catalog.recommendations.len(),
                "Parsed XML catalog"
            );
            report_dangling_rates(catalog);
        }
        Ok(catalogs)
    }

    /// Reads currency, nationality and stay dates from an AvailRQ request.
    pub fn extract_search_context(
        &self,
        request_xml: &str,
    ) -> Result<SearchContext, ProcessingError> {
        let mut search_id = None;
        let mut currency = String::new();
        let mut nationality = String::new();
        let mut start_date = None;
        let mut end_date = None;

        let mut reader = Reader::from_str(request_xml);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.name().as_ref() == b"SearchId" => {
                    search_id = Some(element_text(&mut reader, &e)?);
                }
                Ok(Event::Start(e)) if e.name().as_ref() == b"StartDate" => {
                    start_date = Some(element_text(&mut reader, &e)?);
                }
                Ok(Event::Start(e)) if e.name().as_ref() == b"EndDate" => {
                    end_date = Some(element_text(&mut reader, &e)?);
                }
                Ok(Event::Start(e)) if e.name().as_ref() == b"Currency" => {
                    currency = element_text(&mut reader, &e)?;
                }
                Ok(Event::Start(e)) if e.name().as_ref() == b"Nationality" => {
                    nationality = element_text(&mut reader, &e)?;
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ProcessingError::XmlParseError(format!(
                        "Error at position {}: {:?}",
                        reader.error_position(),
                        e
                    )))
                }
                _ => (),
            }
        }

        let check_in = parse_date(start_date, "StartDate")?;
        let check_out = parse_date(end_date, "EndDate")?;
        check_stay(check_in, check_out)?;

        let mut context = SearchContext::new(check_in, check_out, currency);
        context.nationality = nationality;
        if let Some(search_id) = search_id {
            context.search_id = search_id;
        }
        Ok(context)
    }
}

fn element_text(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<String, ProcessingError> {
    let txt = reader
        .read_text(start.name())
        .map_err(|e| ProcessingError::XmlParseError(e.to_string()))?;
    Ok(format!("{}", txt))
}

fn parse_date(value: Option<String>, field: &str) -> Result<NaiveDate, ProcessingError> {
    let value = value.ok_or_else(|| ProcessingError::MissingRequiredField(field.to_string()))?;

    NaiveDate::parse_from_str(&value, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(&value, "%Y-%m-%d"))
        .map_err(|e| ProcessingError::InvalidFormat(format!("{field} '{value}': {e}")))
}

fn check_stay(check_in: NaiveDate, check_out: NaiveDate) -> Result<(), ProcessingError> {
    if check_out <= check_in {
        return Err(ProcessingError::InvalidFormat(format!(
            "check-out {check_out} is not after check-in {check_in}"
        )));
    }
    Ok(())
}

// Recommendations naming rates no room offers are kept as-is; the engine
// simply never surfaces those rates.
fn report_dangling_rates(catalog: &SearchCatalog) {
    for rec in &catalog.recommendations {
        for rate_id in &rec.rate_ids {
            if catalog.rate(rate_id).is_none() {
                warn!(
                    hotel_id = %catalog.hotel_id,
                    recommendation_id = %rec.recommendation_id,
                    rate_id = %rate_id,
                    "Recommendation references a rate no room offers"
                );
            }
        }
    }
}

// A small multi-room feed for inline testing
pub const SMALL_SAMPLE_XML: &str = r#"
<AvailRS>
  <Hotels>
    <Hotel code="39776757" name="Days Inn By Wyndham Fargo">
      <MealPlans>
        <MealPlan code="RO">
          <Options>
            <Option type="Hotel" paymentType="MerchantPay" status="OK">
              <Price currency="GBP" amount="169.64"/>
              <Rooms>
                <Room id="1#ND1" roomCandidateRefId="1" code="ND1" description="ROOM, QUEEN BED" numberOfUnits="1" nonRefundable="false">
                  <Price currency="GBP" amount="84.82"/>
                </Room>
                <Room id="2#ND2" roomCandidateRefId="2" code="ND2" description="ROOM, 2 DOUBLE BEDS" numberOfUnits="1" nonRefundable="false">
                  <Price currency="GBP" amount="84.82"/>
                </Room>
              </Rooms>
              <Parameters>
                <Parameter key="search_token" value="39776757|2025-06-11|2025-06-12|A|US|GBP"/>
                <Parameter key="recommendation_id" value="REC-1"/>
              </Parameters>
            </Option>
            <Option type="Hotel" paymentType="MerchantPay" status="OK">
              <Price currency="GBP" amount="150.00"/>
              <Rooms>
                <Room id="1#ND1" rateKey="ND1-NR" roomCandidateRefId="1" code="ND1" description="ROOM, QUEEN BED" numberOfUnits="1" nonRefundable="true">
                  <Price currency="GBP" amount="75.00"/>
                </Room>
                <Room id="2#ND1" rateKey="ND1-NR-2" roomCandidateRefId="2" code="ND1" description="ROOM, QUEEN BED" numberOfUnits="1" nonRefundable="true">
                  <Price currency="GBP" amount="75.00"/>
                </Room>
              </Rooms>
            </Option>
          </Options>
        </MealPlan>
      </MealPlans>
    </Hotel>
  </Hotels>
</AvailRS>
"#;
