use crate::analysis::format::TemplateVersion;
use crate::models::{GameRecord, OddsSnapshot, TeamSnapshot};

/// Render the user prompt for one game.
///
/// Output depends only on the game and the template version.
pub fn build_analysis_prompt(game: &GameRecord, template: TemplateVersion) -> String {
    let home = &game.home_team;
    let away = &game.away_team;
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Analyze this NFL Week {} matchup and provide a complete betting breakdown.\n\n",
        game.week
    ));

    prompt.push_str("MATCHUP:\n");
    prompt.push_str(&format!(
        "{} ({}) @ {} ({})\n",
        away.name, away.record, home.name, home.record
    ));
    prompt.push_str(&format!("Date: {}\n", game.game_time_display));
    prompt.push_str(&format!(
        "Venue: {} ({})\n",
        game.venue.name,
        if game.venue.indoor { "Indoor" } else { "Outdoor" }
    ));
    if let Some(location) = format_location(&game.venue.city, &game.venue.state) {
        prompt.push_str(&format!("Location: {}\n", location));
    }
    prompt.push_str(&format!("Broadcast: {}\n", game.broadcast));

    prompt.push_str("\nHOME/AWAY SPLITS:\n");
    prompt.push_str(&format!("{}: {} at home\n", home.name, home.home_record));
    prompt.push_str(&format!("{}: {} on road\n", away.name, away.away_record));

    if !home.leaders.is_empty() || !away.leaders.is_empty() {
        prompt.push_str("\nTEAM LEADERS:\n");
        push_leaders(&mut prompt, home);
        push_leaders(&mut prompt, away);
    }

    prompt.push_str("\nCURRENT BETTING LINES:\n");
    match &game.odds {
        Some(odds) => push_odds(&mut prompt, odds, home, away),
        None => prompt.push_str("Lines not yet posted\n"),
    }

    prompt.push_str("\n\n");
    prompt.push_str(&response_format(template));
    prompt
}

/// The closing block that tells the model which labels to use
pub fn response_format(template: TemplateVersion) -> String {
    let mut block = String::from("Please provide your analysis in this exact format:\n");
    for section in template.sections() {
        block.push_str(&format!("\n{}:\n{}\n", section.label.header(), section.guidance));
    }
    block
}

fn format_location(city: &str, state: &str) -> Option<String> {
    let parts: Vec<&str> = [city, state]
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn push_leaders(prompt: &mut String, team: &TeamSnapshot) {
    if team.leaders.is_empty() {
        return;
    }

    prompt.push_str(&format!("{}:\n", team.name));
    let lines = [
        ("QB", &team.leaders.passing),
        ("RB", &team.leaders.rushing),
        ("WR", &team.leaders.receiving),
    ];
    for (position, leader) in lines {
        if let Some(leader) = leader {
            prompt.push_str(&format!(
                "  {}: {} - {}\n",
                position, leader.player, leader.stats
            ));
        }
    }
}

fn push_odds(prompt: &mut String, odds: &OddsSnapshot, home: &TeamSnapshot, away: &TeamSnapshot) {
    prompt.push_str(&format!("Spread: {}\n", odds.spread_details));
    prompt.push_str(&format!("Over/Under: {}\n", odds.over_under));
    prompt.push_str(&format!(
        "Moneyline: {} {} / {} {}\n",
        home.abbreviation,
        format_moneyline(odds.home_moneyline),
        away.abbreviation,
        format_moneyline(odds.away_moneyline)
    ));
    prompt.push_str(&format!("Source: {}\n", odds.provider));
}

fn format_moneyline(price: Option<i32>) -> String {
    price
        .map(|p| format!("{:+}", p))
        .unwrap_or_else(|| "N/A".to_string())
}
