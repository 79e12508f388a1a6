//! Plain stdin/stdout interaction: prompts, library picker and confirmation.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use crossterm::style::Stylize;

use crate::download::models::LibrarySection;

mod export;

pub(crate) use export::{SessionOptions, run};

pub(crate) fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let stdin = io::stdin();
    let mut line = String::new();
    let read = stdin.lock().read_line(&mut line)?;
    if read == 0 {
        bail!("stdin closed while waiting for input");
    }
    Ok(line)
}

/// Ask until a non-empty answer is given.
pub(crate) fn prompt_required(prompt: &str) -> Result<String> {
    loop {
        let answer = read_line(prompt)?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
    }
}

pub(crate) fn pick_section(sections: &[LibrarySection]) -> Result<LibrarySection> {
    println!();
    for (idx, section) in sections.iter().enumerate() {
        println!("  {}: {} ({})", idx + 1, section.title, section.media_type);
    }
    loop {
        let choice = read_line("Select library: ")?;
        match parse_choice(choice.trim(), sections.len()) {
            Some(idx) => return Ok(sections[idx].clone()),
            None => println!("{} enter a number between 1 and {}", "INVALID:".yellow(), sections.len()),
        }
    }
}

pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    let answer = read_line(prompt).context("read confirmation")?;
    Ok(is_yes(&answer))
}

/// 1-based menu choice → index.
fn parse_choice(input: &str, len: usize) -> Option<usize> {
    let n = input.parse::<usize>().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

fn is_yes(answer: &str) -> bool {
    answer.trim() == "y"
}
