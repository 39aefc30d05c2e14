//! Line commands accepted by `loop run`.

use std::path::PathBuf;

use crate::photo::Phase;

/// Help text printed at startup and on `help`.
pub const HELP: &str = "\
Commands:
  start                  start or resume the clock
  stop                   pause the clock
  reset                  clear tasks, notes and photos
  done N                 mark task N complete
  note N TEXT            set the note for task N
  photo N before|after FILE
                         attach an image file to task N
  status                 show the current loop
  help                   show this help
  quit                   leave (a running clock keeps its state)";

/// One parsed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractiveCommand {
    /// Start the clock.
    Start,
    /// Stop the clock.
    Stop,
    /// Reset the loop.
    Reset,
    /// Complete a task.
    Done(usize),
    /// Set a note.
    Note(usize, String),
    /// Attach a photo from a file.
    Photo(usize, Phase, PathBuf),
    /// Print status.
    Status,
    /// Print help.
    Help,
    /// Leave interactive mode.
    Quit,
    /// Blank line.
    Empty,
}

fn parse_index(arg: Option<&str>, usage: &str) -> Result<usize, String> {
    let arg = arg.ok_or_else(|| format!("usage: {usage}"))?;
    arg.parse()
        .map_err(|_| format!("'{arg}' is not a task number"))
}

/// Parse one input line.
///
/// # Errors
///
/// Returns a message suitable for printing when the line is not a command.
pub fn parse_interactive(line: &str) -> Result<InteractiveCommand, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();

    match word.to_ascii_lowercase().as_str() {
        "" => Ok(InteractiveCommand::Empty),
        "start" => Ok(InteractiveCommand::Start),
        "stop" | "pause" => Ok(InteractiveCommand::Stop),
        "reset" => Ok(InteractiveCommand::Reset),
        "status" | "s" => Ok(InteractiveCommand::Status),
        "help" | "?" => Ok(InteractiveCommand::Help),
        "quit" | "exit" | "q" => Ok(InteractiveCommand::Quit),
        "done" | "complete" => {
            let index = parse_index(rest.split_whitespace().next(), "done N")?;
            Ok(InteractiveCommand::Done(index))
        }
        "note" => {
            let (index, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let index = parse_index(Some(index).filter(|s| !s.is_empty()), "note N TEXT")?;
            Ok(InteractiveCommand::Note(index, text.trim().to_string()))
        }
        "photo" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            let usage = "photo N before|after FILE";
            let index = parse_index(parts.next().filter(|s| !s.is_empty()), usage)?;
            let phase: Phase = parts
                .next()
                .ok_or_else(|| format!("usage: {usage}"))?
                .parse()
                .map_err(|_| format!("usage: {usage}"))?;
            let file = parts
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| format!("usage: {usage}"))?;
            Ok(InteractiveCommand::Photo(index, phase, PathBuf::from(file)))
        }
        other => Err(format!("unknown command '{other}', type 'help'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_interactive("start"), Ok(InteractiveCommand::Start));
        assert_eq!(parse_interactive("  STOP "), Ok(InteractiveCommand::Stop));
        assert_eq!(parse_interactive("q"), Ok(InteractiveCommand::Quit));
        assert_eq!(parse_interactive(""), Ok(InteractiveCommand::Empty));
    }

    #[test]
    fn test_done() {
        assert_eq!(parse_interactive("done 4"), Ok(InteractiveCommand::Done(4)));
        assert!(parse_interactive("done").is_err());
        assert!(parse_interactive("done four").is_err());
    }

    #[test]
    fn test_note_keeps_spaces() {
        assert_eq!(
            parse_interactive("note 2 wet floor sign   left out"),
            Ok(InteractiveCommand::Note(2, "wet floor sign   left out".to_string()))
        );
        assert_eq!(
            parse_interactive("note 2"),
            Ok(InteractiveCommand::Note(2, String::new()))
        );
        assert!(parse_interactive("note").is_err());
    }

    #[test]
    fn test_photo() {
        assert_eq!(
            parse_interactive("photo 3 before /tmp/shots/sink 1.jpg"),
            Ok(InteractiveCommand::Photo(
                3,
                Phase::Before,
                PathBuf::from("/tmp/shots/sink 1.jpg")
            ))
        );
        assert!(parse_interactive("photo 3 during x.jpg").is_err());
        assert!(parse_interactive("photo 3 after").is_err());
    }

    #[test]
    fn test_unknown() {
        let err = parse_interactive("dance").unwrap_err();
        assert!(err.contains("dance"));
    }
}
