use std::collections::HashMap;

use rust_xlsxwriter::*;
use uuid::Uuid;

use crate::error::Result;
use crate::models::cv::{Cv, CvStatus};
use crate::services::scoring::{score, ScoreWeights};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub struct ExportService;

impl ExportService {
    fn status_color(status: CvStatus) -> Color {
        match status {
            CvStatus::Pending => Color::RGB(0xF59E0B),
            CvStatus::Accepted => Color::RGB(0x10B981),
            CvStatus::Rejected => Color::RGB(0xEF4444),
        }
    }

    /// Styled workbook of CVs with their score and the title of the posting they applied to.
    pub fn generate_cvs_xlsx(
        cvs: &[Cv],
        job_titles: &HashMap<Uuid, String>,
        weights: &ScoreWeights,
    ) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("CVs")?;

        let header_bg = Color::RGB(0x0F172A);
        let primary_color = Color::RGB(0x1E293B);
        let border_color = Color::RGB(0xE2E8F0);

        let columns = [
            ("#", 6.0),
            ("Name", 28.0),
            ("Email", 30.0),
            ("Phone", 18.0),
            ("Location", 18.0),
            ("Position", 24.0),
            ("Experience (years)", 14.0),
            ("Skills", 40.0),
            ("Languages", 20.0),
            ("Certifications", 28.0),
            ("Status", 14.0),
            ("Requirements match (%)", 16.0),
            ("Score", 10.0),
            ("Job", 30.0),
            ("Submitted", 18.0),
        ];
        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }
        let last_col = (columns.len() - 1) as u16;

        let title_format = Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);
        worksheet.set_row_height(0, 36)?;
        let title = format!(
            "CV export  •  {}  •  {} CVs",
            chrono::Utc::now().format("%Y-%m-%d %H:%M UTC"),
            cvs.len()
        );
        worksheet.merge_range(0, 0, 0, last_col, &title, &title_format)?;

        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(Color::White)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);
        let header_row = 1;
        worksheet.set_row_height(header_row, 30)?;
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_format)?;
        }

        let data_start_row = 2;
        for (idx, cv) in cvs.iter().enumerate() {
            let row = data_start_row + idx as u32;
            let bg = if idx % 2 == 0 { Color::RGB(0xF8FAFC) } else { Color::White };
            let base_fmt = Format::new()
                .set_font_size(10)
                .set_background_color(bg)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);
            let wrap_fmt = base_fmt.clone().set_text_wrap();

            worksheet.write_number_with_format(row, 0, (idx + 1) as f64, &center_fmt)?;
            worksheet.write_string_with_format(row, 1, &cv.applicant_name, &base_fmt.clone().set_bold())?;
            worksheet.write_string_with_format(row, 2, &cv.email, &base_fmt)?;
            worksheet.write_string_with_format(row, 3, cv.phone.as_deref().unwrap_or("-"), &base_fmt)?;
            worksheet.write_string_with_format(row, 4, cv.location.as_deref().unwrap_or("-"), &base_fmt)?;
            worksheet.write_string_with_format(
                row,
                5,
                cv.current_position.as_deref().unwrap_or("-"),
                &base_fmt,
            )?;
            worksheet.write_number_with_format(row, 6, f64::from(cv.years_experience), &center_fmt)?;
            worksheet.write_string_with_format(row, 7, &cv.skills.join(", "), &wrap_fmt)?;
            worksheet.write_string_with_format(row, 8, &cv.languages.join(", "), &wrap_fmt)?;
            worksheet.write_string_with_format(row, 9, &cv.certifications.join(", "), &wrap_fmt)?;

            let status_fmt = Format::new()
                .set_font_size(10)
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Self::status_color(cv.status))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            worksheet.write_string_with_format(row, 10, cv.status.as_str(), &status_fmt)?;

            worksheet.write_number_with_format(row, 11, f64::from(cv.requirements_match), &center_fmt)?;
            worksheet.write_number_with_format(row, 12, score(cv, weights), &center_fmt)?;

            let job = cv
                .job_id
                .and_then(|id| job_titles.get(&id))
                .map(String::as_str)
                .unwrap_or("-");
            worksheet.write_string_with_format(row, 13, job, &wrap_fmt)?;
            worksheet.write_string_with_format(
                row,
                14,
                &cv.created_at.format("%Y-%m-%d %H:%M").to_string(),
                &center_fmt,
            )?;
        }

        worksheet.set_freeze_panes(2, 0)?;
        let last_row = (data_start_row + cvs.len() as u32).saturating_sub(1).max(header_row);
        worksheet.autofilter(header_row, 0, last_row, last_col)?;

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }

    pub fn filename() -> String {
        format!("cvs_{}.xlsx", chrono::Utc::now().format("%Y%m%d_%H%M"))
    }
}
