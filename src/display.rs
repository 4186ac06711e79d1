use anyhow::Result;
use crossterm::{
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};

use std::io::{stdout, Write};

use lineup::packed_board::Cell;
use lineup::{GameState, Position};

/// Draws the board with row 0 at the top, underlining the last piece played
pub fn display(state: &GameState) -> Result<()> {
    let mut stdout = stdout();
    let board = state.board();
    let gravity = state.rules().gravity;

    let header: String = (1..=board.cols()).map(|col| format!("{:>3}", col)).collect();
    stdout.queue(PrintStyledContent(style(format!("\n   {}\n", header))))?;

    for row in 0..board.rows() {
        // free-placement moves are entered as "row col"
        let label = if gravity {
            "   ".to_string()
        } else {
            format!("{:>3}", row + 1)
        };
        stdout.queue(PrintStyledContent(style(label)))?;

        for col in 0..board.cols() {
            let pos = Position::new(row, col);
            let mut piece = style(" O ")
                .attribute(Attribute::Bold)
                .on(Color::DarkBlue)
                .with(match board.at(pos) {
                    Cell::One => Color::Red,
                    Cell::Two => Color::Yellow,
                    Cell::Empty => Color::DarkBlue,
                });
            if state.last_move() == Some(pos) {
                piece = piece.attribute(Attribute::Underlined);
            }
            stdout.queue(PrintStyledContent(piece))?;
        }
        stdout.queue(PrintStyledContent(style("\n")))?;
    }
    stdout.flush()?;
    Ok(())
}
