use thiserror::Error;

/// Commands understood by the bot, already stripped of the prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join,
    Play { query: String },
    Pause,
    Resume,
    Skip,
    Stop,
    Queue { page: usize },
    NowPlaying,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Parses a chat message into a command.
///
/// Returns `None` for messages that don't start with `prefix` or name a
/// command the bot doesn't have, so unrelated chatter is ignored.
pub fn parse(prefix: &str, content: &str) -> Option<Result<Command, ParseError>> {
    let rest = content.trim_start().strip_prefix(prefix)?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "join" => Ok(Command::Join),
        "play" | "p" => {
            if args.is_empty() {
                Err(ParseError::MissingArgument("query"))
            } else {
                Ok(Command::Play {
                    query: args.to_string(),
                })
            }
        }
        "pause" => Ok(Command::Pause),
        "resume" => Ok(Command::Resume),
        "skip" => Ok(Command::Skip),
        "stop" => Ok(Command::Stop),
        "queue" | "q" => parse_page(args).map(|page| Command::Queue { page }),
        "nowplaying" | "np" => Ok(Command::NowPlaying),
        "disconnect" | "leave" => Ok(Command::Disconnect),
        _ => return None,
    };

    Some(command)
}

fn parse_page(args: &str) -> Result<usize, ParseError> {
    if args.is_empty() {
        return Ok(1);
    }

    match args.parse::<usize>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(ParseError::InvalidArgument("page")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parses_simple_commands() {
        assert_eq!(parse("!", "!join"), Some(Ok(Command::Join)));
        assert_eq!(parse("!", "!pause"), Some(Ok(Command::Pause)));
        assert_eq!(parse("!", "!resume"), Some(Ok(Command::Resume)));
        assert_eq!(parse("!", "!skip"), Some(Ok(Command::Skip)));
        assert_eq!(parse("!", "!stop"), Some(Ok(Command::Stop)));
        assert_eq!(parse("!", "!np"), Some(Ok(Command::NowPlaying)));
        assert_eq!(parse("!", "!leave"), Some(Ok(Command::Disconnect)));
        assert_eq!(parse("!", "  !DISCONNECT"), Some(Ok(Command::Disconnect)));
    }

    #[test]
    fn test_play_keeps_whole_query() {
        assert_eq!(
            parse("!", "!play  never gonna give you up "),
            Some(Ok(Command::Play {
                query: "never gonna give you up".to_string()
            }))
        );
        assert_eq!(
            parse("!", "!play"),
            Some(Err(ParseError::MissingArgument("query")))
        );
        assert_eq!(
            ParseError::MissingArgument("query").to_string(),
            "Missing argument: query"
        );
    }

    #[test]
    fn test_queue_page_argument() {
        assert_eq!(parse("!", "!queue"), Some(Ok(Command::Queue { page: 1 })));
        assert_eq!(parse("!", "!queue 3"), Some(Ok(Command::Queue { page: 3 })));
        assert_eq!(
            parse("!", "!queue 0"),
            Some(Err(ParseError::InvalidArgument("page")))
        );
        assert_eq!(
            parse("!", "!queue next"),
            Some(Err(ParseError::InvalidArgument("page")))
        );
    }

    #[test]
    fn test_ignores_other_messages() {
        assert_eq!(parse("!", "hello there"), None);
        assert_eq!(parse("!", "!dance"), None);
        assert_eq!(parse("?", "!play song"), None);
        assert_eq!(parse("!", "!"), None);
    }

    #[test]
    fn test_custom_prefix() {
        assert_eq!(
            parse("m.", "m.play lofi"),
            Some(Ok(Command::Play {
                query: "lofi".to_string()
            }))
        );
    }
}
