use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::ExportError;
use crate::lead::{NormalizedLead, RawLead};

/// Candidate raw field names per output field, in priority order
pub const NAME_ALIASES: &[&str] = &["full_name", "name"];
pub const EMAIL_ALIASES: &[&str] = &["email", "email_address", "work_email"];
pub const PHONE_ALIASES: &[&str] = &["phone_number", "phone", "mobile_number", "mobile"];

/// Represents a rendered export ready for writing
pub struct RenderedExport {
    pub buffer: Vec<u8>,
    pub lead_count: usize,
}

/// Map a raw lead onto the export schema. Missing values become empty strings.
pub fn normalize_lead(raw: &RawLead) -> NormalizedLead {
    let name = lookup(raw, NAME_ALIASES)
        .or_else(|| {
            let parts: Vec<String> = ["first_name", "last_name"]
                .iter()
                .filter_map(|alias| lookup(raw, &[*alias]))
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        })
        .unwrap_or_default();

    NormalizedLead {
        id: raw.id.clone(),
        name,
        email: lookup(raw, EMAIL_ALIASES)
            .map(|e| e.to_lowercase())
            .unwrap_or_default(),
        phone: lookup(raw, PHONE_ALIASES).unwrap_or_default(),
        created_time: raw.created_time.clone().unwrap_or_default(),
    }
}

/// First non-empty value among `aliases`, trying `field_data` before top-level keys
fn lookup(raw: &RawLead, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|alias| field_value(raw, alias))
        .or_else(|| aliases.iter().find_map(|alias| top_level_value(raw, alias)))
}

fn field_value(raw: &RawLead, alias: &str) -> Option<String> {
    raw.field_data
        .iter()
        .filter(|field| field.name.trim().eq_ignore_ascii_case(alias))
        .find_map(|field| non_empty(field.values.first()?))
}

fn top_level_value(raw: &RawLead, alias: &str) -> Option<String> {
    raw.extra
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(alias))
        .find_map(|(_, value)| match value {
            Value::String(s) => non_empty(s),
            _ => None,
        })
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Render normalized leads in the requested format.
///
/// An empty slice still renders a well-formed document: `[]` or a lone header row.
pub fn render(leads: &[NormalizedLead], format: OutputFormat) -> Result<RenderedExport, ExportError> {
    let buffer = match format {
        OutputFormat::Json => serde_json::to_vec(leads)?,
        OutputFormat::Csv => {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(Vec::with_capacity(64 + leads.len() * 128));
            writer.write_record(NormalizedLead::COLUMNS)?;
            for lead in leads {
                writer.serialize(lead)?;
            }
            writer
                .into_inner()
                .map_err(|e| ExportError::Render(e.to_string()))?
        }
    };

    Ok(RenderedExport {
        buffer,
        lead_count: leads.len(),
    })
}
