use crate::domain::models::AttachedApplication;
use crate::domain::service::ChangeRequestView;
use crate::errors::{ResultResp, ServerError};
use crate::responses::xlsx_response;
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

pub const EXPORT_HEADERS: [&str; 15] = [
    "CR ID",
    "CR Title",
    "CR Description",
    "Priority",
    "Overall Status",
    "Start Date",
    "End Date",
    "Application Name",
    "Application Description",
    "Application Owner",
    "Pre-Change Status",
    "Post-Change Status",
    "Pre-Change Comments",
    "Post-Change Comments",
    "Last Updated",
];

fn stamp(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

/// One row per attached application; a request without applications still
/// gets a single row with the application columns blank.
pub fn export_rows(views: &[ChangeRequestView]) -> Vec<[String; 15]> {
    let mut rows = Vec::new();

    for v in views {
        let cr = &v.change_request;
        let base = |a: Option<&AttachedApplication>| -> [String; 15] {
            let r = a.map(|a| &a.record);
            let last_updated = r
                .and_then(|r| r.pre_updated_at.max(r.post_updated_at))
                .unwrap_or(cr.updated_at);
            [
                cr.change_id.clone(),
                cr.title.clone(),
                cr.description.clone().unwrap_or_default(),
                cr.change_type.as_str().to_string(),
                v.validation.overall.label().to_string(),
                stamp(cr.start_time),
                stamp(cr.end_time),
                a.map(|a| a.application.name.clone()).unwrap_or_default(),
                a.and_then(|a| a.application.description.clone())
                    .unwrap_or_default(),
                a.and_then(|a| a.owner.as_ref().map(|o| o.name.clone()))
                    .unwrap_or_default(),
                r.map(|r| r.pre_status.label().to_string()).unwrap_or_default(),
                r.map(|r| r.post_status.label().to_string()).unwrap_or_default(),
                r.and_then(|r| r.pre_comments.clone()).unwrap_or_default(),
                r.and_then(|r| r.post_comments.clone()).unwrap_or_default(),
                stamp(last_updated),
            ]
        };

        if v.applications.is_empty() {
            rows.push(base(None));
        } else {
            rows.extend(v.applications.iter().map(|a| base(Some(a))));
        }
    }
    rows
}

fn write_row(
    worksheet: &mut Worksheet,
    row: u32,
    cells: &[impl AsRef<str>],
    format: Option<&Format>,
) -> Result<(), ServerError> {
    for (col, value) in cells.iter().enumerate() {
        let res = match format {
            Some(f) => worksheet.write_string_with_format(row, col as u16, value.as_ref(), f),
            None => worksheet.write_string(row, col as u16, value.as_ref()),
        };
        res.map_err(|e| {
            ServerError::XlsxError(format!("Failed to write row {row} column {col}: {e}"))
        })?;
    }
    Ok(())
}

pub fn export_change_requests_xlsx(views: &[ChangeRequestView], today: &str) -> ResultResp {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Change Requests")
        .map_err(|e| ServerError::XlsxError(format!("Failed to name worksheet: {e}")))?;

    let bold = Format::new().set_bold();
    write_row(worksheet, 0, &EXPORT_HEADERS, Some(&bold))?;

    for (i, cells) in export_rows(views).iter().enumerate() {
        write_row(worksheet, (i + 1) as u32, cells, None)?;
    }

    let buffer = workbook
        .save_to_buffer()
        .map_err(|e| ServerError::XlsxError(format!("Failed to save workbook: {e}")))?;

    xlsx_response(buffer, &format!("change_requests_{today}.xlsx"))
}
