use std::{fs, io::Write};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use schulmanager_ics_core::{
    prelude::*,
    providers::schulmanager::SchulmanagerProvider,
};

/// Parameters of `generate`
pub struct GenerateParams {
    pub username: String,
    pub password: String,
    pub output: Option<String>,
    pub calendar_name: Option<String>,
    pub timezone: Option<String>,
    pub reminder_minutes: Option<u32>,
    pub date: Option<String>,
}

fn feed_service() -> Result<FeedService> {
    let config = ProviderConfig::from_env()?;
    tracing::debug!("Using Schulmanager instance at {}", config.base_url);
    Ok(FeedService::new(SchulmanagerProvider::new(config)?))
}

fn reference_date(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("Invalid date {date:?}, expected YYYY-MM-DD: {e}")),
        None => Ok(Local::now().date_naive()),
    }
}

fn output_path(output: Option<String>, username: &str) -> String {
    output.unwrap_or_else(|| format!("schulmanager-{username}.ics"))
}

pub async fn generate_command(params: GenerateParams) -> Result<()> {
    let today = reference_date(params.date.as_deref())?;
    tracing::info!("Generating calendar for {} around {}", params.username, today);

    let service = feed_service()?;
    let credentials = Credentials::new(params.username.clone(), params.password);

    eprintln!("Fetching timetable...");
    let events = service.events(&credentials, today).await?;
    eprintln!("✓ Fetched {} lessons", events.len());

    let defaults = IcsOptions::default();
    let options = IcsOptions {
        calendar_name: params.calendar_name.or(defaults.calendar_name),
        timezone: params.timezone,
        reminder_minutes: params.reminder_minutes,
    };
    let ics_content = IcsGenerator::new(options).generate(&events)?;

    let output_file = output_path(params.output, &params.username);
    if output_file == "-" {
        std::io::stdout().write_all(ics_content.as_bytes())?;
    } else {
        fs::write(&output_file, ics_content)?;
        eprintln!("✓ ICS file saved to {output_file}");
    }

    Ok(())
}

pub async fn validate_command(username: String, password: String) -> Result<()> {
    tracing::info!("Validating credentials for {}", username);

    let service = feed_service()?;
    let credentials = Credentials::new(username, password);

    eprintln!("Logging in...");
    let (_, student_id) = service.login(&credentials).await?;
    eprintln!("✓ Credentials valid, linked student {student_id}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_date() {
        assert_eq!(
            reference_date(Some("2024-05-08")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 8).unwrap()
        );
        assert!(reference_date(Some("08.05.2024")).is_err());
        assert!(reference_date(None).is_ok());
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path(None, "max"), "schulmanager-max.ics");
        assert_eq!(output_path(Some("-".to_string()), "max"), "-");
        assert_eq!(output_path(Some("a.ics".to_string()), "max"), "a.ics");
    }
}
