use tablechat_agent::setup::{prepare_sheet, sample_rows};
use tablechat_agent::source::CsvWorkbook;
use tablechat_core::config::LoadOptions;
use tablechat_core::ApplicationError;
use uuid::Uuid;

use crate::commands::{async_runtime, load_config, CommandResult};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("seed", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match async_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let workbook = CsvWorkbook::new(config.sheet.data_dir.clone());
    match runtime.block_on(prepare_sheet(&workbook, &config.sheet.name)) {
        Ok(sheet) => CommandResult::success("seed", seed_message(&sheet, &config.sheet.name, &workbook)),
        Err(error) => CommandResult::from_application_error(
            "seed",
            ApplicationError::from(error),
            &Uuid::new_v4().to_string(),
        ),
    }
}

fn seed_message(sheet: &str, requested: &str, workbook: &CsvWorkbook) -> String {
    let mut message = format!(
        "sheet `{sheet}` populated with {} sample employees at {}",
        sample_rows().len() - 1,
        workbook.sheet_path(sheet).display()
    );
    if sheet != requested {
        message.push_str(&format!(
            "; note: using sheet `{sheet}` instead of `{requested}`, set sheet.name to match"
        ));
    }
    message
}
