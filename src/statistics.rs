// src/statistics.rs

use std::collections::{HashMap, HashSet};

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use serde::Serialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::db::{LEAGUES, PLAYERS, TEAMS};
use crate::error::ApiResult;
use crate::models::{City, ImageRef, League, Player, Score, Team};

pub const POINTS_PER_WIN: u32 = 3;
pub const POINTS_PER_DRAW: u32 = 1;

// ─── TEAM STANDINGS ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub team_name: String,
    pub image: Option<ImageRef>,
    pub city: City,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeagueRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub league_name: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub date: DateTime<Utc>,
    pub team_a: String,
    pub team_b: String,
    pub score: Score,
    pub winner: Option<String>,
    pub league: LeagueRef,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    pub team: TeamSummary,
    pub goals_scored: u32,
    pub goals_conceded: u32,
    pub matches_played: usize,
    pub leagues_participated: usize,
    pub win_count: u32,
    pub loss_count: u32,
    pub draw_count: u32,
    pub clean_sheets: u32,
    pub assists_count: u32,
    pub points: u32,
    pub goals_per_match: f64,
    pub goals_conceded_per_match: f64,
    pub win_percentage: f64,
    pub points_per_match: f64,
    pub goal_difference: i64,
    pub matches: Vec<MatchSummary>,
}

#[derive(Default)]
struct TeamTally {
    goals_scored: u32,
    goals_conceded: u32,
    matches: HashSet<String>,
    leagues: HashSet<String>,
    wins: u32,
    losses: u32,
    draws: u32,
    clean_sheets: u32,
    assists: u32,
    history: Vec<MatchSummary>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn per_match(total: u32, matches: usize, places: i32) -> f64 {
    if matches == 0 {
        0.0
    } else {
        round_to(total as f64 / matches as f64, places)
    }
}

/// Standings of every team that has played at least one match, best first.
///
/// Matches missing either side or a score are ignored. A match without a
/// winner counts as a draw for both sides.
pub fn team_standings(leagues: &[League], teams: &[Team]) -> Vec<TeamStats> {
    let mut tallies: HashMap<&str, TeamTally> =
        teams.iter().map(|t| (t.id.as_str(), TeamTally::default())).collect();

    for league in leagues {
        for m in &league.matches {
            let (Some(a), Some(b), Some(score)) = (m.team_a.as_deref(), m.team_b.as_deref(), m.score) else {
                continue;
            };

            let summary = MatchSummary {
                id: m.id.clone(),
                date: m.date,
                team_a: a.to_string(),
                team_b: b.to_string(),
                score,
                winner: m.winner.clone(),
                league: LeagueRef {
                    id: league.id.clone(),
                    league_name: league.league_name.clone(),
                },
            };

            for (side, scored, conceded, kept_clean) in [
                (a, score.team_a, score.team_b, m.clean_sheets.team_a),
                (b, score.team_b, score.team_a, m.clean_sheets.team_b),
            ] {
                if let Some(tally) = tallies.get_mut(side) {
                    tally.history.push(summary.clone());
                    tally.leagues.insert(league.id.clone());
                    tally.matches.insert(m.id.clone());
                    tally.goals_scored += scored;
                    tally.goals_conceded += conceded;
                    if kept_clean {
                        tally.clean_sheets += 1;
                    }
                }
            }

            match m.winner.as_deref() {
                Some(winner) => {
                    if let Some(tally) = tallies.get_mut(winner) {
                        tally.wins += 1;
                    }
                    let loser = if winner == a {
                        Some(b)
                    } else if winner == b {
                        Some(a)
                    } else {
                        None
                    };
                    if let Some(tally) = loser.and_then(|l| tallies.get_mut(l)) {
                        tally.losses += 1;
                    }
                }
                None => {
                    for side in [a, b] {
                        if let Some(tally) = tallies.get_mut(side) {
                            tally.draws += 1;
                        }
                    }
                }
            }

            for assist in &m.assists {
                if let Some(tally) = assist.team.as_deref().and_then(|t| tallies.get_mut(t)) {
                    tally.assists += assist.score;
                }
            }
        }
    }

    let mut standings: Vec<TeamStats> = teams
        .iter()
        .filter_map(|team| {
            let mut tally = tallies.remove(team.id.as_str())?;
            let played = tally.matches.len();
            if played == 0 {
                return None;
            }
            let points = tally.wins * POINTS_PER_WIN + tally.draws * POINTS_PER_DRAW;
            tally.history.sort_by(|x, y| y.date.cmp(&x.date));

            Some(TeamStats {
                team: TeamSummary {
                    id: team.id.clone(),
                    team_name: team.team_name.clone(),
                    image: team.image.clone(),
                    city: team.city,
                },
                goals_scored: tally.goals_scored,
                goals_conceded: tally.goals_conceded,
                matches_played: played,
                leagues_participated: tally.leagues.len(),
                win_count: tally.wins,
                loss_count: tally.losses,
                draw_count: tally.draws,
                clean_sheets: tally.clean_sheets,
                assists_count: tally.assists,
                points,
                goals_per_match: per_match(tally.goals_scored, played, 2),
                goals_conceded_per_match: per_match(tally.goals_conceded, played, 2),
                win_percentage: round_to(tally.wins as f64 / played as f64 * 100.0, 1),
                points_per_match: per_match(points, played, 2),
                goal_difference: tally.goals_scored as i64 - tally.goals_conceded as i64,
                matches: tally.history,
            })
        })
        .collect();

    standings.sort_by(|x, y| {
        y.points
            .cmp(&x.points)
            .then_with(|| y.goal_difference.cmp(&x.goal_difference))
    });
    standings
}

// ─── PLAYER STATISTICS ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTeamRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub team_name: String,
    pub image: Option<ImageRef>,
}

#[derive(Debug, Serialize, Clone)]
pub struct PlayerSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub image: Option<ImageRef>,
    pub team: Option<PlayerTeamRef>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub player: PlayerSummary,
    pub goals: u32,
    pub assists: u32,
    pub matches_played: usize,
    pub clean_sheets: u32,
    pub win_count: u32,
    pub loss_count: u32,
    pub draw_count: u32,
    pub goals_per_match: f64,
    pub assists_per_match: f64,
    pub win_percentage: f64,
}

#[derive(Default)]
struct PlayerTally {
    goals: u32,
    assists: u32,
    clean_sheets: u32,
    matches: HashSet<String>,
    results_counted: HashSet<String>,
    wins: u32,
    losses: u32,
    draws: u32,
}

/// Per-player totals across every league, in the order the players are given.
///
/// A player "plays" a match by scoring, assisting or keeping a clean sheet in
/// it. Wins, losses and draws are credited to scorers, once per match, with
/// the result taken from the score line.
pub fn player_statistics(leagues: &[League], players: &[Player], teams: &[Team]) -> Vec<PlayerStats> {
    let mut tallies: HashMap<&str, PlayerTally> =
        players.iter().map(|p| (p.id.as_str(), PlayerTally::default())).collect();

    for league in leagues {
        for m in &league.matches {
            let (Some(a), Some(b), Some(score)) = (m.team_a.as_deref(), m.team_b.as_deref(), m.score) else {
                continue;
            };
            let winning_team = match score.team_a.cmp(&score.team_b) {
                std::cmp::Ordering::Greater => Some(a),
                std::cmp::Ordering::Less => Some(b),
                std::cmp::Ordering::Equal => None,
            };

            for scorer in &m.scorers {
                let Some(tally) = scorer.player.as_deref().and_then(|p| tallies.get_mut(p)) else {
                    continue;
                };
                tally.goals += scorer.score;
                tally.matches.insert(m.id.clone());

                let Some(team) = scorer.team.as_deref() else { continue };
                if !tally.results_counted.insert(m.id.clone()) {
                    continue;
                }
                match winning_team {
                    None => tally.draws += 1,
                    Some(w) if w == team => tally.wins += 1,
                    Some(_) => tally.losses += 1,
                }
            }

            for assist in &m.assists {
                if let Some(tally) = assist.player.as_deref().and_then(|p| tallies.get_mut(p)) {
                    tally.assists += assist.score;
                    tally.matches.insert(m.id.clone());
                }
            }

            let keepers = [
                (m.clean_sheets.team_a, m.clean_sheets.goal_keeper_a.as_deref()),
                (m.clean_sheets.team_b, m.clean_sheets.goal_keeper_b.as_deref()),
            ];
            for (clean, keeper) in keepers {
                if !clean {
                    continue;
                }
                if let Some(tally) = keeper.and_then(|k| tallies.get_mut(k)) {
                    tally.clean_sheets += 1;
                    tally.matches.insert(m.id.clone());
                }
            }
        }
    }

    let team_refs: HashMap<&str, &Team> = teams.iter().map(|t| (t.id.as_str(), t)).collect();

    players
        .iter()
        .map(|player| {
            let tally = tallies.remove(player.id.as_str()).unwrap_or_default();
            let played = tally.matches.len();
            let team = player
                .team
                .as_deref()
                .and_then(|id| team_refs.get(id))
                .map(|t| PlayerTeamRef {
                    id: t.id.clone(),
                    team_name: t.team_name.clone(),
                    image: t.image.clone(),
                });

            PlayerStats {
                player: PlayerSummary {
                    id: player.id.clone(),
                    name: player.name.clone(),
                    image: player.image.clone(),
                    team,
                },
                goals: tally.goals,
                assists: tally.assists,
                matches_played: played,
                clean_sheets: tally.clean_sheets,
                win_count: tally.wins,
                loss_count: tally.losses,
                draw_count: tally.draws,
                goals_per_match: per_match(tally.goals, played, 2),
                assists_per_match: per_match(tally.assists, played, 2),
                win_percentage: if played == 0 {
                    0.0
                } else {
                    round_to(tally.wins as f64 / played as f64 * 100.0, 1)
                },
            }
        })
        .collect()
}

// ─── HANDLERS ──────────────────────────────────────────────────────────────────

async fn load_all<T>(data: &AppState, name: &str) -> ApiResult<Vec<T>>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync + Unpin,
{
    let docs = data
        .mongodb
        .collection::<T>(name)
        .find(doc! {})
        .await?
        .try_collect()
        .await?;
    Ok(docs)
}

/// GET /teams/statistics
pub async fn get_teams_statistics(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let leagues: Vec<League> = load_all(&data, LEAGUES).await?;
    let teams: Vec<Team> = load_all(&data, TEAMS).await?;
    let standings = team_standings(&leagues, &teams);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": { "teams": standings } })))
}

/// GET /players/statistics
pub async fn get_players_statistics(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let leagues: Vec<League> = load_all(&data, LEAGUES).await?;
    let players: Vec<Player> = load_all(&data, PLAYERS).await?;
    let teams: Vec<Team> = load_all(&data, TEAMS).await?;
    let stats = player_statistics(&leagues, &players, &teams);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": { "players": stats } })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CleanSheets, Contribution, Match};
    use chrono::{NaiveDate, TimeZone};

    fn team(id: &str, name: &str) -> Team {
        Team {
            id: id.into(),
            team_name: name.into(),
            email: format!("{id}@example.com"),
            password: "hash".into(),
            image: None,
            city: City::Lahore,
            players: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn player(id: &str, team: &str) -> Player {
        Player {
            id: id.into(),
            name: id.to_uppercase(),
            image: None,
            team: Some(team.into()),
        }
    }

    fn contribution(player: &str, team: &str, score: u32) -> Contribution {
        Contribution {
            player: Some(player.into()),
            team: Some(team.into()),
            score,
        }
    }

    fn game(id: &str, a: &str, b: &str, goals: (u32, u32), winner: Option<&str>, day: u32) -> Match {
        Match {
            id: id.into(),
            team_a: Some(a.into()),
            team_b: Some(b.into()),
            score: Some(Score { team_a: goals.0, team_b: goals.1 }),
            clean_sheets: CleanSheets::default(),
            scorers: vec![],
            assists: vec![],
            winner: winner.map(String::from),
            date: Utc.with_ymd_and_hms(2024, 3, day, 18, 0, 0).unwrap(),
            time: "18:00".into(),
            created_at: Utc::now(),
        }
    }

    fn league(id: &str, matches: Vec<Match>) -> League {
        League {
            id: id.into(),
            league_name: format!("League {id}"),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            teams: vec![],
            matches,
            image: None,
        }
    }

    #[test]
    fn standings_rank_by_points_then_goal_difference() {
        let teams = vec![team("a", "Alpha"), team("b", "Bravo"), team("c", "Charlie"), team("d", "Delta")];
        let leagues = vec![league(
            "l1",
            vec![
                game("m1", "a", "b", (3, 0), Some("a"), 1),
                game("m2", "b", "c", (1, 1), None, 2),
                game("m3", "c", "a", (2, 1), Some("c"), 3),
            ],
        )];

        let standings = team_standings(&leagues, &teams);
        let order: Vec<&str> = standings.iter().map(|s| s.team.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);

        let c = &standings[0];
        assert_eq!((c.win_count, c.draw_count, c.loss_count), (1, 1, 0));
        assert_eq!(c.points, 4);
        assert_eq!(c.goals_scored, 3);
        assert_eq!(c.goals_conceded, 2);

        let a = &standings[1];
        assert_eq!(a.points, 3);
        assert_eq!(a.goal_difference, 2);
        assert_eq!(a.goals_per_match, 2.0);
        assert_eq!(a.win_percentage, 50.0);
        assert_eq!(a.matches[0].id, "m3", "history is newest first");

        assert!(standings.iter().all(|s| s.team.id != "d"), "teams without matches are omitted");
    }

    #[test]
    fn equal_points_fall_back_to_goal_difference() {
        let teams = vec![team("a", "Alpha"), team("b", "Bravo"), team("c", "Charlie")];
        let leagues = vec![league(
            "l1",
            vec![
                game("m1", "a", "c", (1, 0), Some("a"), 1),
                game("m2", "b", "c", (5, 0), Some("b"), 2),
            ],
        )];
        let standings = team_standings(&leagues, &teams);
        assert_eq!(standings[0].team.id, "b");
        assert_eq!(standings[1].team.id, "a");
        assert_eq!(standings[2].team.id, "c");
        assert_eq!(standings[2].loss_count, 2);
    }

    #[test]
    fn incomplete_matches_and_unknown_teams_are_skipped() {
        let teams = vec![team("a", "Alpha")];
        let mut no_score = game("m1", "a", "x", (0, 0), None, 1);
        no_score.score = None;
        let mut no_side = game("m2", "a", "x", (1, 0), Some("a"), 2);
        no_side.team_b = None;
        let counted = game("m3", "a", "ghost", (2, 2), None, 3);

        let standings = team_standings(&[league("l1", vec![no_score, no_side, counted])], &teams);
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].matches_played, 1);
        assert_eq!(standings[0].draw_count, 1);
        assert_eq!(standings[0].goals_scored, 2);
    }

    #[test]
    fn leagues_clean_sheets_and_assists_are_tallied() {
        let teams = vec![team("a", "Alpha"), team("b", "Bravo")];
        let mut m1 = game("m1", "a", "b", (2, 0), Some("a"), 1);
        m1.clean_sheets.team_a = true;
        m1.assists = vec![contribution("p1", "a", 1), contribution("p2", "a", 1)];
        let m2 = game("m2", "a", "b", (1, 1), None, 5);

        let standings = team_standings(&[league("l1", vec![m1]), league("l2", vec![m2])], &teams);
        let a = standings.iter().find(|s| s.team.id == "a").unwrap();
        assert_eq!(a.leagues_participated, 2);
        assert_eq!(a.clean_sheets, 1);
        assert_eq!(a.assists_count, 2);
        assert_eq!(a.points, 4);
        assert_eq!(a.points_per_match, 2.0);
    }

    #[test]
    fn player_statistics_count_distinct_matches() {
        let teams = vec![team("a", "Alpha"), team("b", "Bravo")];
        let players = vec![player("p1", "a"), player("p2", "a"), player("k", "b"), player("bench", "b")];

        let mut m1 = game("m1", "a", "b", (2, 0), Some("a"), 1);
        m1.scorers = vec![contribution("p1", "a", 1), contribution("p1", "a", 1)];
        m1.assists = vec![contribution("p2", "a", 2)];

        let mut m2 = game("m2", "a", "b", (0, 0), None, 2);
        m2.clean_sheets = CleanSheets {
            team_a: false,
            team_b: true,
            goal_keeper_a: Some("p2".into()),
            goal_keeper_b: Some("k".into()),
        };

        let mut m3 = game("m3", "a", "b", (1, 3), Some("b"), 3);
        m3.scorers = vec![contribution("p1", "a", 1)];

        let stats = player_statistics(&[league("l1", vec![m1, m2, m3])], &players, &teams);
        assert_eq!(stats.len(), 4);

        let p1 = &stats[0];
        assert_eq!(p1.goals, 3);
        assert_eq!(p1.matches_played, 2);
        assert_eq!((p1.win_count, p1.loss_count, p1.draw_count), (1, 1, 0));
        assert_eq!(p1.goals_per_match, 1.5);
        assert_eq!(p1.win_percentage, 50.0);
        assert_eq!(p1.player.team.as_ref().unwrap().team_name, "Alpha");

        let p2 = &stats[1];
        assert_eq!(p2.assists, 2);
        assert_eq!(p2.clean_sheets, 0, "keeper without a clean sheet flag gets nothing");
        assert_eq!(p2.matches_played, 1);

        let keeper = &stats[2];
        assert_eq!(keeper.clean_sheets, 1);
        assert_eq!(keeper.matches_played, 1);

        let bench = &stats[3];
        assert_eq!(bench.matches_played, 0);
        assert_eq!(bench.goals_per_match, 0.0);
    }
}
