//! CLI output formatting.
//!
//! Each command has a `format_*` function returning lines, for testability,
//! and the CLI prints them. Format functions are pure: no I/O, and "now" is
//! always passed in.
//!
//! # Gallery list
//!
//! ```text
//! 001 Today           strip · vintage · hearts · ✨ glow
//!     id: 3f2c9a1e-…
//! 002 3 days ago      polaroid · normal
//!     id: 7b1d…
//! ```

use crate::capture::{BoothState, SoundCue, Step};
use crate::imaging::ComposedOutput;
use crate::store::{MigrationOutcome, PhotoRecord};
use crate::types::{AiPreset, BorderPattern};
use chrono::{DateTime, Local, TimeZone};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// "Today", "Yesterday", "N days ago" within a week, else the calendar date.
pub fn relative_date(timestamp_ms: i64, now: DateTime<Local>) -> String {
    let diff_days = (now.timestamp_millis() - timestamp_ms).div_euclid(DAY_MS);
    match diff_days {
        ..=0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{diff_days} days ago"),
        _ => match Local.timestamp_millis_opt(timestamp_ms).single() {
            Some(date) => date.format("%b %-d, %Y").to_string(),
            None => "Unknown date".to_string(),
        },
    }
}

/// Style summary: template, filter, and border / AI preset when set.
fn style_summary(record: &PhotoRecord) -> String {
    let mut parts = vec![record.template.to_string(), record.filter.to_string()];
    if let Some(pattern) = record.border_pattern
        && pattern != BorderPattern::None
    {
        parts.push(pattern.to_string());
    }
    if let Some(preset) = record.ai_preset
        && preset != AiPreset::None
    {
        parts.push(format!("✨ {preset}"));
    }
    parts.join(" · ")
}

pub fn format_gallery_list(photos: &[PhotoRecord], now: DateTime<Local>) -> Vec<String> {
    if photos.is_empty() {
        return vec!["No memories yet. Run `blushbooth booth` to take some.".to_string()];
    }
    let mut lines = Vec::with_capacity(photos.len() * 2);
    for (i, photo) in photos.iter().enumerate() {
        lines.push(format!(
            "{} {:<15} {}",
            format_index(i + 1),
            relative_date(photo.timestamp, now),
            style_summary(photo)
        ));
        lines.push(format!("    id: {}", photo.id));
    }
    lines
}

pub fn format_photo_detail(photo: &PhotoRecord, now: DateTime<Local>) -> Vec<String> {
    vec![
        format!("Photo {}", photo.id),
        format!("    Taken: {}", relative_date(photo.timestamp, now)),
        format!("    Style: {}", style_summary(photo)),
        format!("    Shots: {}", photo.assets.len()),
        format!(
            "    AI enhanced: {}",
            if photo.enhanced.is_some() { "yes" } else { "no" }
        ),
    ]
}

/// One countdown step as the booth would announce it.
pub fn format_step(step: &Step) -> Option<String> {
    let cue = match step.cue {
        Some(SoundCue::Beep) => " *beep*",
        Some(SoundCue::Shutter) => " *click*",
        None => "",
    };
    let text = match step.state {
        BoothState::Countdown(n) => format!("{n}…"),
        BoothState::Capturing => "Smile! 📸".to_string(),
        BoothState::Finishing => "Printing your memories…".to_string(),
        BoothState::Idle | BoothState::Cooldown | BoothState::Done => return None,
    };
    Some(format!("{text}{cue}"))
}

pub fn format_composed(output: &ComposedOutput, path: &std::path::Path) -> String {
    format!(
        "Saved {}x{} PNG ({} KB) → {}",
        output.width,
        output.height,
        output.png.len().div_ceil(1024),
        path.display()
    )
}

pub fn format_migration(outcome: &MigrationOutcome) -> String {
    match outcome {
        MigrationOutcome::NothingToMigrate => "No legacy photos to migrate".to_string(),
        MigrationOutcome::Migrated(n) => format!("Migrated {n} legacy photo(s)"),
        MigrationOutcome::Failed(reason) => {
            format!("Migration failed, legacy data kept: {reason}")
        }
    }
}
