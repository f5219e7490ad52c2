use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};

use crate::config::Config;
use crate::session::Session;

use super::draw;

const HELP: &str = "\
commands:
  search <terms...>   show entries matching any term (blank: everything)
  keyword <name>      keep only entries tagged <name>
  keyword #<n>        keep only entries tagged with keyword number <n>
  clear               drop search and keyword filters
  list                show the current list again
  open <n>            show the raw BibTeX of entry <n> in the list
  show <key>          show the raw BibTeX of <key>
  keywords            list all keywords
  reload              sync and reload the library
  help                show this help
  quit                leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseCommand {
    Search(String),
    Keyword(String),
    KeywordIndex(usize),
    Clear,
    List,
    Open(usize),
    Show(String),
    Keywords,
    Reload,
    Help,
    Quit,
}

impl BrowseCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "search" | "s" => BrowseCommand::Search(rest.to_string()),
            "keyword" | "k" => {
                if rest.is_empty() {
                    bail!("keyword needs a name or #<n>");
                }
                match rest.strip_prefix('#') {
                    Some(number) => BrowseCommand::KeywordIndex(
                        number
                            .trim()
                            .parse()
                            .map_err(|_| anyhow!("invalid keyword number `{}`", number))?,
                    ),
                    None => BrowseCommand::Keyword(rest.to_string()),
                }
            }
            "clear" | "reset" => BrowseCommand::Clear,
            "list" | "ls" => BrowseCommand::List,
            "open" | "o" => {
                let position: usize = rest
                    .parse()
                    .map_err(|_| anyhow!("open needs an entry number, got `{}`", rest))?;
                if position == 0 {
                    bail!("entry numbers start at 1");
                }
                BrowseCommand::Open(position)
            }
            "show" => {
                if rest.is_empty() {
                    bail!("show needs a citation key");
                }
                BrowseCommand::Show(rest.to_string())
            }
            "keywords" => BrowseCommand::Keywords,
            "reload" | "refresh" => BrowseCommand::Reload,
            "help" | "?" => BrowseCommand::Help,
            "quit" | "exit" | "q" => BrowseCommand::Quit,
            other => bail!("unknown command `{}` (try `help`)", other),
        };
        Ok(Some(command))
    }
}

enum Exit {
    Quit,
    Reload,
}

/// Line-oriented browsing session reading commands from `input`.
pub struct App<'a, R, W> {
    config: &'a Config,
    offline: bool,
    input: io::Lines<R>,
    out: W,
}

impl<'a, R: BufRead, W: Write> App<'a, R, W> {
    pub fn new(config: &'a Config, offline: bool, input: R, out: W) -> Self {
        Self {
            config,
            offline,
            input: input.lines(),
            out,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut session = Session::load(self.config, self.offline)?;
        self.announce(&session)?;

        loop {
            match self.event_loop(&session)? {
                Exit::Quit => return Ok(()),
                Exit::Reload => match Session::load(self.config, self.offline) {
                    Ok(fresh) => {
                        session = fresh;
                        self.announce(&session)?;
                    }
                    Err(err) => writeln!(self.out, "error: reload failed: {:#}", err)?,
                },
            }
        }
    }

    fn announce(&mut self, session: &Session) -> Result<()> {
        if !session.editable() {
            writeln!(
                self.out,
                "offline: using cached library at {}",
                self.config.library.display()
            )?;
        }
        draw::numbered_entries(&mut self.out, &session.view())
    }

    /// Serve commands against one session until quit, reload, or end of input.
    fn event_loop(&mut self, session: &Session) -> Result<Exit> {
        let mut view = session.view();

        while let Some(line) = self.input.next() {
            let line = line.context("failed to read command")?;
            let command = match BrowseCommand::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(err) => {
                    writeln!(self.out, "error: {}", err)?;
                    continue;
                }
            };
            tracing::debug!(?command, "browse command");

            match command {
                BrowseCommand::Search(query) => {
                    view.apply_query(&query);
                    draw::numbered_entries(&mut self.out, &view)?;
                }
                BrowseCommand::Keyword(keyword) => {
                    view.apply_keyword(&keyword);
                    draw::numbered_entries(&mut self.out, &view)?;
                }
                BrowseCommand::KeywordIndex(index) => match view.select_keyword(index) {
                    Ok(()) => draw::numbered_entries(&mut self.out, &view)?,
                    Err(err) => writeln!(self.out, "error: {}", err)?,
                },
                BrowseCommand::Clear => {
                    view.reset();
                    draw::numbered_entries(&mut self.out, &view)?;
                }
                BrowseCommand::List => draw::numbered_entries(&mut self.out, &view)?,
                BrowseCommand::Open(position) => match view.displayed_at(position - 1) {
                    Some(record) => self.show(session, &record.key)?,
                    None => writeln!(self.out, "error: no entry {} in the current list", position)?,
                },
                BrowseCommand::Show(key) => self.show(session, &key)?,
                BrowseCommand::Keywords => draw::keywords(&mut self.out, session.library())?,
                BrowseCommand::Reload => return Ok(Exit::Reload),
                BrowseCommand::Help => writeln!(self.out, "{}", HELP)?,
                BrowseCommand::Quit => return Ok(Exit::Quit),
            }
        }

        Ok(Exit::Quit)
    }

    fn show(&mut self, session: &Session, key: &str) -> Result<()> {
        match draw::raw_entry(&mut self.out, session, key) {
            Ok(true) => {}
            Ok(false) => writeln!(self.out, "error: no entry found for key `{}`", key)?,
            Err(err) => writeln!(self.out, "error: {}", err)?,
        }
        Ok(())
    }
}
