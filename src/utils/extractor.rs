use crate::error::{PipelineError, Result};
use crate::models::{GameRecord, LeaderLine, OddsSnapshot, TeamLeaders, TeamSnapshot, Venue};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

const NOT_AVAILABLE: &str = "N/A";

/// ESPN scoreboard envelope. Events stay raw so one bad event can't sink the rest.
#[derive(Debug, Deserialize)]
struct EspnScoreboard {
    #[serde(default)]
    events: Vec<Value>,
    week: Option<EspnWeek>,
    season: Option<EspnSeason>,
}

#[derive(Debug, Deserialize)]
struct EspnWeek {
    number: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EspnSeason {
    year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct EspnEvent {
    id: String,
    #[serde(default)]
    date: String,
    week: Option<EspnWeek>,
    #[serde(default)]
    competitions: Vec<EspnCompetition>,
}

#[derive(Debug, Deserialize)]
struct EspnCompetition {
    #[serde(default)]
    competitors: Vec<EspnCompetitor>,
    venue: Option<EspnVenue>,
    status: Option<EspnStatus>,
    #[serde(default)]
    broadcasts: Vec<EspnBroadcast>,
    #[serde(default)]
    odds: Vec<EspnOdds>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnCompetitor {
    home_away: Option<String>,
    team: EspnTeam,
    #[serde(default)]
    records: Vec<EspnRecord>,
    #[serde(default)]
    leaders: Vec<EspnLeaderCategory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnTeam {
    id: String,
    display_name: String,
    abbreviation: String,
}

#[derive(Debug, Deserialize)]
struct EspnRecord {
    #[serde(rename = "type")]
    kind: Option<String>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EspnLeaderCategory {
    name: String,
    #[serde(default)]
    leaders: Vec<EspnLeader>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnLeader {
    display_value: String,
    athlete: EspnAthlete,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnAthlete {
    display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnVenue {
    full_name: Option<String>,
    address: Option<EspnAddress>,
    #[serde(default)]
    indoor: bool,
}

#[derive(Debug, Deserialize)]
struct EspnAddress {
    city: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EspnStatus {
    #[serde(rename = "type")]
    kind: EspnStatusType,
}

#[derive(Debug, Deserialize)]
struct EspnStatusType {
    state: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EspnBroadcast {
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnOdds {
    provider: Option<EspnProvider>,
    details: Option<String>,
    over_under: Option<Value>,
    home_team_odds: Option<EspnTeamOdds>,
    away_team_odds: Option<EspnTeamOdds>,
}

#[derive(Debug, Deserialize)]
struct EspnProvider {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnTeamOdds {
    money_line: Option<Value>,
}

/// Values used when the scoreboard itself doesn't say which week or season it covers
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext {
    pub season_year: i32,
    pub week: Option<u32>,
}

/// Games pulled from one scoreboard plus the events that had to be dropped
#[derive(Debug, Default)]
pub struct ExtractedGames {
    pub games: Vec<GameRecord>,
    pub errors: Vec<PipelineError>,
}

/// Extract every event of a scoreboard. A malformed event is logged and
/// skipped; it never stops the remaining events.
pub fn extract_games(scoreboard: &Value, ctx: ExtractContext) -> Result<ExtractedGames> {
    let envelope: EspnScoreboard = serde_json::from_value(scoreboard.clone())?;

    let ctx = ExtractContext {
        season_year: envelope
            .season
            .and_then(|s| s.year)
            .unwrap_or(ctx.season_year),
        week: envelope.week.and_then(|w| w.number).or(ctx.week),
    };

    let mut extracted = ExtractedGames::default();
    for event in &envelope.events {
        match extract_game(event, ctx) {
            Ok(game) => extracted.games.push(game),
            Err(e) => {
                warn!("Error extracting game: {}", e);
                extracted.errors.push(e);
            }
        }
    }

    Ok(extracted)
}

/// Build a `GameRecord` from one raw ESPN event
pub fn extract_game(event: &Value, ctx: ExtractContext) -> Result<GameRecord> {
    let event_id = event
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    let event: EspnEvent = serde_json::from_value(event.clone())
        .map_err(|e| PipelineError::extraction(&event_id, e.to_string()))?;

    let competition = match event.competitions.as_slice() {
        [competition] => competition,
        [] => return Err(PipelineError::extraction(&event_id, "no competition")),
        _ => {
            return Err(PipelineError::extraction(
                &event_id,
                "more than one competition",
            ))
        }
    };

    if competition.competitors.len() != 2 {
        return Err(PipelineError::extraction(
            &event_id,
            format!("expected 2 competitors, found {}", competition.competitors.len()),
        ));
    }

    let side = |tag: &str| {
        competition
            .competitors
            .iter()
            .find(|c| c.home_away.as_deref() == Some(tag))
            .ok_or_else(|| PipelineError::extraction(&event_id, format!("no {} team", tag)))
    };
    let home = side("home")?;
    let away = side("away")?;

    if home.team.id == away.team.id {
        return Err(PipelineError::extraction(
            &event_id,
            format!("{} listed on both sides", home.team.display_name),
        ));
    }

    let status = competition.status.as_ref().map(|s| &s.kind);

    Ok(GameRecord {
        game_id: event.id.clone(),
        week: event
            .week
            .as_ref()
            .and_then(|w| w.number)
            .or(ctx.week)
            .unwrap_or(0),
        season_year: ctx.season_year,
        game_time: event.date.clone(),
        game_time_display: status
            .and_then(|s| s.detail.clone())
            .unwrap_or_default(),
        status: status.and_then(|s| s.state.clone()).unwrap_or_default(),
        home_team: team_snapshot(home),
        away_team: team_snapshot(away),
        venue: venue(competition.venue.as_ref()),
        broadcast: competition
            .broadcasts
            .first()
            .and_then(|b| b.names.first())
            .cloned()
            .unwrap_or_else(|| "TBD".to_string()),
        odds: odds_snapshot(&competition.odds),
    })
}

fn team_snapshot(competitor: &EspnCompetitor) -> TeamSnapshot {
    let record = |kind: &str| {
        competitor
            .records
            .iter()
            .find(|r| r.kind.as_deref() == Some(kind))
            .and_then(|r| r.summary.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };

    TeamSnapshot {
        id: competitor.team.id.clone(),
        name: competitor.team.display_name.clone(),
        abbreviation: competitor.team.abbreviation.clone(),
        record: record("total"),
        home_record: record("home"),
        away_record: record("road"),
        leaders: leaders(&competitor.leaders),
    }
}

fn leaders(categories: &[EspnLeaderCategory]) -> TeamLeaders {
    let first_leader = |name: &str| {
        categories
            .iter()
            .find(|c| c.name == name && !c.leaders.is_empty())
            .and_then(|c| c.leaders.first())
            .map(|leader| LeaderLine {
                player: leader.athlete.display_name.clone(),
                stats: leader.display_value.clone(),
            })
    };

    TeamLeaders {
        passing: first_leader("passingLeader"),
        rushing: first_leader("rushingLeader"),
        receiving: first_leader("receivingLeader"),
    }
}

fn venue(venue: Option<&EspnVenue>) -> Venue {
    let address = venue.and_then(|v| v.address.as_ref());

    Venue {
        name: venue
            .and_then(|v| v.full_name.clone())
            .unwrap_or_else(|| "TBD".to_string()),
        city: address.and_then(|a| a.city.clone()).unwrap_or_default(),
        state: address.and_then(|a| a.state.clone()).unwrap_or_default(),
        indoor: venue.map(|v| v.indoor).unwrap_or(false),
    }
}

/// `None` until the books post lines
fn odds_snapshot(odds: &[EspnOdds]) -> Option<OddsSnapshot> {
    let odds = odds.first()?;

    Some(OddsSnapshot {
        provider: odds
            .provider
            .as_ref()
            .and_then(|p| p.name.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        spread_details: odds
            .details
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        over_under: odds
            .over_under
            .as_ref()
            .and_then(display_value)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        home_moneyline: odds
            .home_team_odds
            .as_ref()
            .and_then(|o| o.money_line.as_ref())
            .and_then(moneyline),
        away_moneyline: odds
            .away_team_odds
            .as_ref()
            .and_then(|o| o.money_line.as_ref())
            .and_then(moneyline),
    })
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// ESPN sends moneylines as numbers, occasionally as "+310"-style strings
fn moneyline(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Week number the scoreboard reports for itself
pub fn scoreboard_week(scoreboard: &Value) -> Option<u32> {
    scoreboard
        .pointer("/week/number")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

/// Whether any event on the scoreboard has yet to kick off
pub fn has_upcoming_game(scoreboard: &Value) -> bool {
    scoreboard
        .get("events")
        .and_then(Value::as_array)
        .map(|events| {
            events.iter().any(|event| {
                event
                    .pointer("/competitions/0/status/type/state")
                    .or_else(|| event.pointer("/status/type/state"))
                    .and_then(Value::as_str)
                    == Some("pre")
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CTX: ExtractContext = ExtractContext {
        season_year: 2025,
        week: None,
    };

    fn fixture() -> Value {
        serde_json::from_str(include_str!("../../fixtures/mock_scoreboard.json")).unwrap()
    }

    fn minimal_event(id: &str, competitors: Value) -> Value {
        json!({
            "id": id,
            "date": "2025-12-07T18:00Z",
            "competitions": [{
                "competitors": competitors,
                "status": { "type": { "state": "pre", "detail": "Sun, December 7th at 1:00 PM EST" } }
            }]
        })
    }

    fn competitor(id: &str, name: &str, abbr: &str, side: &str) -> Value {
        json!({
            "homeAway": side,
            "team": { "id": id, "displayName": name, "abbreviation": abbr }
        })
    }

    #[test]
    fn test_extract_fixture() {
        let extracted = extract_games(&fixture(), CTX).unwrap();
        assert!(extracted.errors.is_empty());
        assert_eq!(extracted.games.len(), 3);

        let game = &extracted.games[0];
        assert_eq!(game.game_id, "401772943");
        assert_eq!(game.week, 13);
        assert_eq!(game.season_year, 2025);
        assert_eq!(game.status, "pre");
        assert_eq!(game.game_time, "2025-11-27T18:00Z");
        assert_eq!(game.game_time_display, "Thu, November 27th at 1:00 PM EST");
        assert_eq!(game.broadcast, "FOX");
        assert_eq!(game.home_team.name, "Detroit Lions");
        assert_eq!(game.home_team.record, "7-4");
        assert_eq!(game.home_team.home_record, "4-2");
        assert_eq!(game.away_team.abbreviation, "GB");
        assert_eq!(game.away_team.away_record, "3-2");
        assert_eq!(game.venue.name, "Ford Field");
        assert_eq!(game.venue.city, "Detroit");
        assert!(game.venue.indoor);
    }

    #[test]
    fn test_extract_leaders() {
        let extracted = extract_games(&fixture(), CTX).unwrap();
        let game = &extracted.games[0];

        let goff = game.home_team.leaders.passing.as_ref().unwrap();
        assert_eq!(goff.player, "Jared Goff");
        assert_eq!(goff.stats, "2,679 YDS, 23 TD, 5 INT");
        assert!(game.home_team.leaders.receiving.is_some());

        // Category present but empty
        assert!(game.away_team.leaders.receiving.is_none());
        assert!(game.away_team.leaders.rushing.is_some());

        // No leaders list at all
        assert!(extracted.games[2].home_team.leaders.is_empty());
    }

    #[test]
    fn test_extract_odds() {
        let extracted = extract_games(&fixture(), CTX).unwrap();

        let odds = extracted.games[0].odds.as_ref().unwrap();
        assert_eq!(odds.provider, "ESPN BET");
        assert_eq!(odds.spread_details, "DET -2.5");
        assert_eq!(odds.over_under, "48.5");
        assert_eq!(odds.home_moneyline, Some(-142));
        assert_eq!(odds.away_moneyline, Some(120));

        // Empty odds list is a normal state
        assert!(extracted.games[1].odds.is_none());

        let odds = extracted.games[2].odds.as_ref().unwrap();
        assert_eq!(odds.over_under, "51");
        assert_eq!(odds.away_moneyline, Some(310));
    }

    #[test]
    fn test_missing_records_default_to_na() {
        let extracted = extract_games(&fixture(), CTX).unwrap();
        let game = &extracted.games[1];
        assert_eq!(game.home_team.away_record, "N/A");
        assert_eq!(game.away_team.home_record, "N/A");
        assert_eq!(game.away_team.record, "6-5");
    }

    #[test]
    fn test_missing_side_is_dropped_and_batch_continues() {
        let scoreboard = json!({
            "week": { "number": 14 },
            "events": [
                minimal_event("1", json!([
                    competitor("8", "Detroit Lions", "DET", "home"),
                    competitor("9", "Green Bay Packers", "GB", "home"),
                ])),
                minimal_event("2", json!([
                    competitor("6", "Dallas Cowboys", "DAL", "home"),
                    competitor("12", "Kansas City Chiefs", "KC", "away"),
                ])),
                minimal_event("3", json!([
                    competitor("33", "Baltimore Ravens", "BAL", "home"),
                ])),
                { "id": "4", "competitions": "not a list" },
            ]
        });

        let extracted = extract_games(&scoreboard, CTX).unwrap();
        assert_eq!(extracted.games.len(), 1);
        assert_eq!(extracted.games[0].game_id, "2");
        assert_eq!(extracted.games[0].week, 14);
        assert_eq!(extracted.errors.len(), 3);
        assert!(matches!(
            &extracted.errors[0],
            PipelineError::Extraction { event_id, .. } if event_id == "1"
        ));
    }

    #[test]
    fn test_same_team_on_both_sides_is_rejected() {
        let event = minimal_event(
            "7",
            json!([
                competitor("8", "Detroit Lions", "DET", "home"),
                competitor("8", "Detroit Lions", "DET", "away"),
            ]),
        );
        assert!(extract_game(&event, CTX).is_err());
    }

    #[test]
    fn test_sparse_event_uses_defaults() {
        let event = minimal_event(
            "5",
            json!([
                competitor("6", "Dallas Cowboys", "DAL", "home"),
                competitor("12", "Kansas City Chiefs", "KC", "away"),
            ]),
        );
        let ctx = ExtractContext {
            season_year: 2024,
            week: Some(9),
        };
        let game = extract_game(&event, ctx).unwrap();
        assert_eq!(game.week, 9);
        assert_eq!(game.season_year, 2024);
        assert_eq!(game.venue.name, "TBD");
        assert_eq!(game.broadcast, "TBD");
        assert_eq!(game.home_team.record, "N/A");
        assert!(game.odds.is_none());
    }

    #[test]
    fn test_scoreboard_without_events() {
        let extracted = extract_games(&json!({}), CTX).unwrap();
        assert!(extracted.games.is_empty());
        assert!(extracted.errors.is_empty());
    }

    #[test]
    fn test_week_detection_helpers() {
        let scoreboard = fixture();
        assert_eq!(scoreboard_week(&scoreboard), Some(13));
        assert!(has_upcoming_game(&scoreboard));

        let finished = json!({
            "week": { "number": 18 },
            "events": [{ "competitions": [{ "status": { "type": { "state": "post" } } }] }]
        });
        assert!(!has_upcoming_game(&finished));
        assert!(!has_upcoming_game(&json!({})));
    }
}
