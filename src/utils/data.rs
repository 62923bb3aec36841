use crate::models::AnalysisRecord;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Save any serializable value to a pretty-printed JSON file
pub fn save_to_cache<T: Serialize + ?Sized>(data: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
    }
    let json = serde_json::to_string_pretty(data).context("Failed to serialize data")?;
    std::fs::write(path, json).context("Failed to write cache file")?;
    Ok(())
}

/// Load a value previously written with `save_to_cache`
pub fn load_from_cache<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let json = std::fs::read_to_string(path.as_ref()).context("Failed to read cache file")?;
    let data = serde_json::from_str(&json).context("Failed to deserialize cached data")?;
    Ok(data)
}

#[derive(Debug, Serialize)]
struct AnalysisCsvRow<'a> {
    #[serde(rename = "Game ID")]
    game_id: &'a str,
    #[serde(rename = "Top Insight")]
    top_insight: &'a str,
    #[serde(rename = "AI Lean")]
    ai_lean: &'a str,
    #[serde(rename = "Predicted Line")]
    predicted_line: &'a str,
    #[serde(rename = "Predicted Total")]
    predicted_total: &'a str,
    #[serde(rename = "Confidence")]
    confidence: &'a str,
    #[serde(rename = "Injury Impact")]
    injury_impact: &'a str,
    #[serde(rename = "Angles")]
    angles: String,
    #[serde(rename = "Model")]
    model: &'a str,
}

/// Save analyses to CSV, one row per game
pub fn save_analyses_to_csv(analyses: &[AnalysisRecord], path: impl AsRef<Path>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref()).context("Failed to create CSV file")?;

    for analysis in analyses {
        writer
            .serialize(AnalysisCsvRow {
                game_id: &analysis.game_id,
                top_insight: &analysis.top_insight,
                ai_lean: &analysis.ai_lean,
                predicted_line: &analysis.predicted_line,
                predicted_total: &analysis.predicted_total,
                confidence: &analysis.confidence_score,
                injury_impact: &analysis.injury_impact,
                angles: analysis.angles.join(" | "),
                model: &analysis.model_used,
            })
            .context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("nfl_betting_ai_{}_{}", name, std::process::id()))
    }

    fn sample_analysis() -> AnalysisRecord {
        AnalysisRecord {
            game_id: "401772943".to_string(),
            top_insight: "Detroit, rested, at home".to_string(),
            summary: String::new(),
            spread_analysis: String::new(),
            ai_lean: "Lean: Packers +2.5".to_string(),
            angles: vec!["one".to_string(), "two".to_string()],
            predicted_line: "DET -1.5".to_string(),
            predicted_total: "48.5".to_string(),
            team_strength: BTreeMap::new(),
            injury_impact: "Minor".to_string(),
            confidence_score: "Low".to_string(),
            model_used: "gpt-4o-mini".to_string(),
        }
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = scratch_dir("cache");
        let path = dir.join("nested").join("analysis.json");

        save_to_cache(&sample_analysis(), &path).unwrap();
        let loaded: AnalysisRecord = load_from_cache(&path).unwrap();
        assert_eq!(loaded, sample_analysis());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result: Result<AnalysisRecord> = load_from_cache(scratch_dir("missing").join("x.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_analyses_to_csv() {
        let dir = scratch_dir("csv");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("analyses.csv");

        save_analyses_to_csv(&[sample_analysis()], &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert!(lines.next().unwrap().starts_with("Game ID,Top Insight,AI Lean"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Detroit, rested, at home\""));
        assert!(row.contains("one | two"));

        std::fs::remove_dir_all(dir).ok();
    }
}
