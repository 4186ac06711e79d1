use anyhow::{anyhow, Result};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use log::info;

use std::env;
use std::io::{stdin, stdout, Write};
use std::time::Instant;

use lineup::*;

mod display;
use display::display;

fn prompt(question: &str) -> Result<String> {
    print!("{}", question);
    stdout().flush()?;
    let mut buffer = String::new();
    stdin().read_line(&mut buffer)?;
    Ok(buffer.trim().to_lowercase())
}

fn ask_yes_no(question: &str) -> Result<bool> {
    loop {
        match prompt(&format!("{} y/n: ", question))?.chars().next() {
            Some('y') => return Ok(true),
            Some('n') => return Ok(false),
            _ => println!("Unknown answer given"),
        }
    }
}

fn ask_rules() -> Result<Rules> {
    loop {
        let answer = prompt("Choose a game: 1) Connect Four  2) Gomoku  3) Tic-Tac-Toe\n> ")?;
        match answer.as_str() {
            "1" => return Ok(Rules::connect_four()),
            "2" => return Ok(Rules::gomoku()),
            "3" => return Ok(Rules::tic_tac_toe()),
            _ => println!("Unknown answer given"),
        }
    }
}

fn ask_difficulty(player: Player) -> Result<Difficulty> {
    loop {
        let answer = prompt(&format!(
            "{} difficulty: 1) Easy  2) Medium  3) Hard\n> ",
            player
        ))?;
        match answer.as_str() {
            "1" => return Ok(Difficulty::Easy),
            "2" => return Ok(Difficulty::Medium),
            "3" => return Ok(Difficulty::Hard),
            _ => println!("Unknown answer given"),
        }
    }
}

fn ask_count(question: &str) -> Result<u32> {
    loop {
        match prompt(question)?.parse::<u32>() {
            Ok(count) if count > 0 => return Ok(count),
            _ => println!("Please enter a positive number"),
        }
    }
}

/// Reads a 1-indexed column, or "row col" on free-placement boards
fn parse_move(input: &str, rules: Rules) -> Result<Move> {
    let numbers = input
        .split_whitespace()
        .map(|n| n.parse::<u16>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| anyhow!("Invalid move: {}", input))?;
    match (rules.gravity, numbers.as_slice()) {
        (true, &[col]) if col >= 1 => Ok(Move::Drop { col: col - 1 }),
        (false, &[row, col]) if row >= 1 && col >= 1 => Ok(Move::Place {
            row: row - 1,
            col: col - 1,
        }),
        (true, _) => Err(anyhow!("Enter a column number: {}", input)),
        (false, _) => Err(anyhow!("Enter a row and a column: {}", input)),
    }
}

fn print_tally(series: &series::SeriesController) {
    println!(
        "Series after {} games: {} {} - {} {}, {} drawn",
        series.games_played(),
        Player::One,
        series.wins(Player::One),
        series.wins(Player::Two),
        Player::Two,
        series.draws()
    );
}

/// Plays engine against engine without drawing the board
fn self_play(session: &mut Session, games: u32, levels: (Difficulty, Difficulty)) -> Result<()> {
    let progress = ProgressBar::new(games as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("Self-play: {bar:40.cyan/blue} {pos}/{len} games {msg} ~{eta} remaining")
            .progress_chars("█▓▒░  "),
    );

    let start = Instant::now();
    for _ in 0..games {
        while !session.is_game_over() {
            let difficulty = match session.current_player() {
                Player::One => levels.0,
                Player::Two => levels.1,
            };
            let best_move = session
                .get_best_move_for(difficulty)
                .ok_or_else(|| anyhow!("no legal move in an unfinished game"))?;
            session.make_move(best_move)?;
        }
        session.finish_game();

        let series = session.series();
        progress.set_message(&format!(
            "({}-{}-{})",
            series.wins(Player::One),
            series.draws(),
            series.wins(Player::Two)
        ));
        progress.inc(1);
    }
    progress.finish();

    println!("Self-play complete in {}", HumanDuration(start.elapsed()));
    print_tally(session.series());
    Ok(())
}

fn play_game(session: &mut Session, ai_players: (Option<Difficulty>, Option<Difficulty>)) -> Result<()> {
    let rules = session.state().rules();
    loop {
        display(session.state())?;

        if let Some(winner) = session.get_winner() {
            println!("{} wins!", winner);
            return Ok(());
        }
        if session.is_game_over() {
            println!("Draw!");
            return Ok(());
        }

        let player = session.current_player();
        let ai = match player {
            Player::One => ai_players.0,
            Player::Two => ai_players.1,
        };

        let next_move = if let Some(difficulty) = ai {
            println!("AI is thinking...");
            stdout().flush()?;

            // slow down play if both players are AI
            if ai_players.0.is_some() && ai_players.1.is_some() {
                std::thread::sleep(std::time::Duration::new(1, 0));
            }

            let best_move = session
                .get_best_move_for(difficulty)
                .ok_or_else(|| anyhow!("no legal move in an unfinished game"))?;
            println!(
                "{} ({}) evaluates the position at {}",
                player,
                difficulty.name(),
                session.evaluate_position(player)
            );
            println!("Best move: {}", describe(best_move));
            best_move
        } else {
            let forks = session.get_fork_blocking_moves();
            if !forks.is_empty() {
                let hints: Vec<String> = forks.into_iter().map(describe).collect();
                println!("Fork warning, consider: {}", hints.join(", "));
            }
            let input = prompt(&format!("{} move input (u to undo) > ", player))?;
            if input == "u" {
                if session.undo().is_none() {
                    println!("Nothing to undo");
                }
                continue;
            }
            match parse_move(&input, rules) {
                Ok(mv) => mv,
                Err(err) => {
                    println!("{}", err);
                    continue;
                }
            }
        };

        if let Err(err) = session.make_move(next_move) {
            println!("{}", err);
            // try the move again
            continue;
        }
    }
}

fn describe(mv: Move) -> String {
    match mv {
        Move::Drop { col } => format!("{}", col + 1),
        Move::Place { row, col } => format!("{} {}", row + 1, col + 1),
    }
}

fn main() -> Result<()> {
    // default to 'info' unless RUST_LOG says otherwise
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    println!("Welcome to Lineup\n");

    let config = EngineConfig::load_or_default();
    let rules = ask_rules()?;
    let mut session = Session::new(rules, config);
    info!(
        "Playing {}x{} with {} in a row",
        rules.rows, rules.cols, rules.win_length
    );

    if ask_yes_no("Watch the AI play itself?")? {
        let levels = (ask_difficulty(Player::One)?, ask_difficulty(Player::Two)?);
        let games = ask_count("How many games? ")?;
        session.start_new_series(true);
        return self_play(&mut session, games, levels);
    }

    let mut ai_players = (None, None);
    if ask_yes_no("Is player 1 AI controlled?")? {
        ai_players.0 = Some(ask_difficulty(Player::One)?);
    }
    if ask_yes_no("Is player 2 AI controlled?")? {
        ai_players.1 = Some(ask_difficulty(Player::Two)?);
    }

    session.start_new_series(ask_yes_no("Should the loser start the next game?")?);
    loop {
        play_game(&mut session, ai_players)?;
        session.finish_game();
        print_tally(session.series());

        if !ask_yes_no("Play again?")? {
            break;
        }
        println!("{} starts", session.current_player());
    }
    Ok(())
}
