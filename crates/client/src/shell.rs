//! Line-oriented interactive shell on top of [`OfsClient`].
//!
//! Parsing is pure ([`Command::parse`]); execution keeps the most recent
//! directory listing so that `cd` and `rm` can resolve names to entries the
//! server actually reported.

use protocol::{DirectoryEntry, Failure, StorageStats, UserSummary};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::client::OfsClient;
use crate::transport::Transport;

/// Text printed by the `help` command.
pub const HELP: &str = "\
Commands:
  login USER PASSWORD        Log in
  logout                     Log out
  ls                         List the current directory
  cd NAME | .. | /           Change directory
  pwd                        Print the current directory
  cat NAME                   Print a file
  touch NAME [CONTENT...]    Create a file
  mkdir NAME                 Create a directory
  rm NAME                    Delete a file or directory
  useradd USER PASSWORD      Create a user
  userdel USER               Delete a user
  users                      List users
  stats                      Show storage statistics
  whoami                     Show the logged-in user
  help                       Show this help
  quit                       Exit";

/// Where `cd` goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdTarget {
    /// A child directory of the current one.
    Child(String),
    /// The parent directory.
    Parent,
    /// The root.
    Root,
}

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    List,
    Cd(CdTarget),
    Pwd,
    Cat(String),
    Touch { name: String, content: String },
    Mkdir(String),
    Rm(String),
    UserAdd { username: String, password: String },
    UserDel(String),
    Users,
    Stats,
    Whoami,
    Help,
    Quit,
}

/// Errors for lines that are not valid commands.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command: {0} (try 'help')")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

fn exactly<'a, const N: usize>(
    args: &[&'a str],
    usage: &'static str,
) -> Result<[&'a str; N], ParseError> {
    <[&str; N]>::try_from(args).map_err(|_| ParseError::Usage(usage))
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match keyword {
            "login" => {
                let [username, password] = exactly::<2>(&args, "login USER PASSWORD")?;
                Command::Login {
                    username: username.to_string(),
                    password: password.to_string(),
                }
            }
            "logout" => {
                exactly::<0>(&args, "logout")?;
                Command::Logout
            }
            "ls" => {
                exactly::<0>(&args, "ls")?;
                Command::List
            }
            "cd" => {
                let [target] = exactly::<1>(&args, "cd NAME | .. | /")?;
                Command::Cd(match target {
                    ".." => CdTarget::Parent,
                    "/" => CdTarget::Root,
                    name => CdTarget::Child(name.to_string()),
                })
            }
            "pwd" => {
                exactly::<0>(&args, "pwd")?;
                Command::Pwd
            }
            "cat" => {
                let [name] = exactly::<1>(&args, "cat NAME")?;
                Command::Cat(name.to_string())
            }
            "touch" => {
                let (name, rest) = args
                    .split_first()
                    .ok_or(ParseError::Usage("touch NAME [CONTENT...]"))?;
                Command::Touch {
                    name: name.to_string(),
                    content: rest.join(" "),
                }
            }
            "mkdir" => {
                let [name] = exactly::<1>(&args, "mkdir NAME")?;
                Command::Mkdir(name.to_string())
            }
            "rm" => {
                let [name] = exactly::<1>(&args, "rm NAME")?;
                Command::Rm(name.to_string())
            }
            "useradd" => {
                let [username, password] = exactly::<2>(&args, "useradd USER PASSWORD")?;
                Command::UserAdd {
                    username: username.to_string(),
                    password: password.to_string(),
                }
            }
            "userdel" => {
                let [username] = exactly::<1>(&args, "userdel USER")?;
                Command::UserDel(username.to_string())
            }
            "users" => {
                exactly::<0>(&args, "users")?;
                Command::Users
            }
            "stats" => {
                exactly::<0>(&args, "stats")?;
                Command::Stats
            }
            "whoami" => {
                exactly::<0>(&args, "whoami")?;
                Command::Whoami
            }
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(ParseError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Print this text (possibly empty) and keep going.
    Output(String),
    /// Leave the shell.
    Quit,
}

/// Interactive shell state.
pub struct Shell<T: Transport> {
    client: OfsClient<T>,
    listing: Vec<DirectoryEntry>,
}

fn format_listing(entries: &[DirectoryEntry]) -> String {
    if entries.is_empty() {
        return "(empty)".to_string();
    }
    entries
        .iter()
        .map(|entry| match entry.size {
            _ if entry.is_directory() => format!("{}/", entry.name),
            Some(size) => format!("{:<32} {size}", entry.name),
            None => entry.name.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_stats(stats: &StorageStats) -> String {
    format!(
        "total size:   {}\nused space:   {}\nfree space:   {}\nfiles:        {}\ndirectories:  {}",
        stats.total_size,
        stats.used_space,
        stats.free_space,
        stats.total_files,
        stats.total_directories
    )
}

fn format_users(users: &[UserSummary]) -> String {
    users
        .iter()
        .map(|user| format!("{:<16} {}", user.username, user.role))
        .collect::<Vec<_>>()
        .join("\n")
}

fn error_text(failure: Failure) -> String {
    format!("error: {failure}")
}

impl<T: Transport> Shell<T> {
    pub fn new(client: OfsClient<T>) -> Self {
        Self {
            client,
            listing: Vec::new(),
        }
    }

    pub fn client(&self) -> &OfsClient<T> {
        &self.client
    }

    /// The listing shown most recently.
    pub fn listing(&self) -> &[DirectoryEntry] {
        &self.listing
    }

    /// Prompt showing identity and location.
    pub fn prompt(&self) -> String {
        let identity = self.client.session().identity().unwrap_or("guest");
        format!("{identity}@ofs:{}> ", self.client.current_path())
    }

    /// Execute one command. Failures become output, never errors.
    pub async fn execute(&mut self, command: Command) -> Step {
        let text = match command {
            Command::Quit => return Step::Quit,
            Command::Help => HELP.to_string(),
            Command::Pwd => self.client.current_path().to_string(),
            Command::Whoami => match self.client.session().identity() {
                Some(identity) if self.client.session().is_privileged() => {
                    format!("{identity} (admin)")
                }
                Some(identity) => identity.to_string(),
                None => "not logged in".to_string(),
            },
            Command::Login { username, password } => {
                self.listing.clear();
                match self.client.login(&username, &password).await {
                    Ok(()) => {
                        let greeting = format!("logged in as {username}");
                        match self.refresh().await {
                            Ok(listing) => format!("{greeting}\n{listing}"),
                            Err(failure) => format!("{greeting}\n{}", error_text(failure)),
                        }
                    }
                    Err(failure) => format!("login failed: {failure}"),
                }
            }
            Command::Logout => {
                self.client.logout();
                self.listing.clear();
                "logged out".to_string()
            }
            Command::List => self.refresh().await.unwrap_or_else(error_text),
            Command::Cd(target) => self.change_directory(target).await.unwrap_or_else(error_text),
            Command::Cat(name) => self.client.read_file(&name).await.unwrap_or_else(error_text),
            Command::Touch { name, content } => {
                let result = self.client.create_file(&name, &content).await;
                self.after_mutation(result, format!("created {name}")).await
            }
            Command::Mkdir(name) => {
                let result = self.client.create_directory(&name).await;
                self.after_mutation(result, format!("created {name}/")).await
            }
            Command::Rm(name) => match self.lookup(&name).await {
                Ok(entry) => {
                    let result = self.client.delete(&entry).await;
                    self.after_mutation(result, format!("deleted {name}")).await
                }
                Err(failure) => error_text(failure),
            },
            Command::UserAdd { username, password } => self
                .client
                .create_user(&username, &password)
                .await
                .map(|()| format!("created user {username}"))
                .unwrap_or_else(error_text),
            Command::UserDel(username) => self
                .client
                .delete_user(&username)
                .await
                .map(|()| format!("deleted user {username}"))
                .unwrap_or_else(error_text),
            Command::Users => self
                .client
                .list_users()
                .await
                .map(|users| format_users(&users))
                .unwrap_or_else(error_text),
            Command::Stats => self
                .client
                .stats()
                .await
                .map(|stats| format_stats(&stats))
                .unwrap_or_else(error_text),
        };
        Step::Output(text)
    }

    /// Read commands from `input` until it ends or `quit` is entered.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        loop {
            output.write_all(self.prompt().as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                output.write_all(b"\n").await?;
                break;
            };

            let text = match Command::parse(&line) {
                Ok(None) => continue,
                Ok(Some(command)) => match self.execute(command).await {
                    Step::Quit => break,
                    Step::Output(text) => text,
                },
                Err(e) => e.to_string(),
            };

            if !text.is_empty() {
                output.write_all(text.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
        }
        output.flush().await
    }

    async fn refresh(&mut self) -> Result<String, Failure> {
        let result = self.client.list().await;
        self.remember(result)
    }

    fn remember(&mut self, result: Result<Vec<DirectoryEntry>, Failure>) -> Result<String, Failure> {
        match result {
            Ok(entries) => {
                let text = format_listing(&entries);
                self.listing = entries;
                Ok(text)
            }
            Err(failure) => {
                self.listing.clear();
                Err(failure)
            }
        }
    }

    async fn change_directory(&mut self, target: CdTarget) -> Result<String, Failure> {
        let result = match target {
            CdTarget::Parent => self.client.navigate_up().await,
            CdTarget::Root => self.client.navigate_root().await,
            CdTarget::Child(name) => {
                let entry = self.lookup(&name).await?;
                self.client.navigate_into(&entry).await
            }
        };
        self.remember(result)
    }

    /// Find `name` in the cached listing, refreshing it once if absent.
    async fn lookup(&mut self, name: &str) -> Result<DirectoryEntry, Failure> {
        if let Some(entry) = self.listing.iter().find(|e| e.name == name) {
            return Ok(entry.clone());
        }
        self.refresh().await?;
        self.listing
            .iter()
            .find(|e| e.name == name)
            .cloned()
            .ok_or_else(|| Failure::new(format!("no such entry: {name}")))
    }

    async fn after_mutation(&mut self, result: Result<(), Failure>, done: String) -> String {
        match result {
            Ok(()) => match self.refresh().await {
                Ok(listing) => format!("{done}\n{listing}"),
                Err(failure) => format!("{done}\n{}", error_text(failure)),
            },
            Err(failure) => error_text(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientOptions;
    use crate::transport::TransportError;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CannedTransport {
        replies: Mutex<VecDeque<Value>>,
        operations: Mutex<Vec<String>>,
    }

    impl CannedTransport {
        fn with(replies: Vec<Value>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                operations: Mutex::default(),
            }
        }

        fn operations(&self) -> Vec<String> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl Transport for CannedTransport {
        async fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
            let request: Value = serde_json::from_slice(payload).unwrap();
            self.operations
                .lock()
                .unwrap()
                .push(request["operation"].as_str().unwrap().to_string());
            match self.replies.lock().unwrap().pop_front() {
                Some(reply) => Ok(serde_json::to_vec(&reply).unwrap()),
                None => Err(TransportError::EmptyResponse),
            }
        }
    }

    fn shell(replies: Vec<Value>) -> Shell<CannedTransport> {
        Shell::new(OfsClient::new(
            CannedTransport::with(replies),
            ClientOptions::default(),
        ))
    }

    fn login_ok() -> Value {
        json!({ "status": "success", "data": { "session_id": "sess_admin_1" } })
    }

    fn root_listing() -> Value {
        json!({ "status": "success", "data": { "files": [
            { "name": "projects", "type": "dir" },
            { "name": "readme.txt", "type": "file", "size": 5 }
        ] } })
    }

    fn empty_listing() -> Value {
        json!({ "status": "success", "data": { "files": [] } })
    }

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(Command::parse(""), Ok(None));
        assert_eq!(Command::parse("   \t "), Ok(None));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse("ls"), Command::List);
        assert_eq!(parse("  pwd  "), Command::Pwd);
        assert_eq!(parse("stats"), Command::Stats);
        assert_eq!(parse("users"), Command::Users);
        assert_eq!(parse("whoami"), Command::Whoami);
        assert_eq!(parse("logout"), Command::Logout);
        assert_eq!(parse("help"), Command::Help);
        assert_eq!(parse("exit"), Command::Quit);
        assert_eq!(parse("quit"), Command::Quit);
    }

    #[test]
    fn test_parse_login() {
        assert_eq!(
            parse("login admin admin123"),
            Command::Login {
                username: "admin".into(),
                password: "admin123".into()
            }
        );
        assert_eq!(
            Command::parse("login admin"),
            Err(ParseError::Usage("login USER PASSWORD"))
        );
    }

    #[test]
    fn test_parse_cd_targets() {
        assert_eq!(parse("cd .."), Command::Cd(CdTarget::Parent));
        assert_eq!(parse("cd /"), Command::Cd(CdTarget::Root));
        assert_eq!(
            parse("cd projects"),
            Command::Cd(CdTarget::Child("projects".into()))
        );
        assert!(Command::parse("cd").is_err());
        assert!(Command::parse("cd a b").is_err());
    }

    #[test]
    fn test_parse_touch_joins_content() {
        assert_eq!(
            parse("touch notes.txt hello   world"),
            Command::Touch {
                name: "notes.txt".into(),
                content: "hello world".into()
            }
        );
        assert_eq!(
            parse("touch empty.txt"),
            Command::Touch {
                name: "empty.txt".into(),
                content: String::new()
            }
        );
        assert!(Command::parse("touch").is_err());
    }

    #[test]
    fn test_parse_rejects_extra_arguments() {
        assert_eq!(Command::parse("ls -l"), Err(ParseError::Usage("ls")));
        assert_eq!(Command::parse("users --all"), Err(ParseError::Usage("users")));
        assert_eq!(Command::parse("stats now"), Err(ParseError::Usage("stats")));
        assert_eq!(
            Command::parse("whoami really"),
            Err(ParseError::Usage("whoami"))
        );
        assert!(Command::parse("rm a b").is_err());
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            Command::parse("format c:"),
            Err(ParseError::UnknownCommand("format".into()))
        );
    }

    #[tokio::test]
    async fn test_login_shows_listing() {
        let mut shell = shell(vec![login_ok(), root_listing()]);

        let Step::Output(text) = shell.execute(parse("login admin admin123")).await else {
            panic!("unexpected quit");
        };

        assert!(text.starts_with("logged in as admin"));
        assert!(text.contains("projects/"));
        assert!(text.contains("readme.txt"));
        assert_eq!(shell.listing().len(), 2);
        assert_eq!(shell.prompt(), "admin@ofs:/> ");
    }

    #[tokio::test]
    async fn test_cd_uses_cached_listing() {
        let mut shell = shell(vec![login_ok(), root_listing(), empty_listing()]);
        shell.execute(parse("login admin admin123")).await;

        let step = shell.execute(parse("cd projects")).await;

        assert_eq!(step, Step::Output("(empty)".into()));
        assert_eq!(shell.client().current_path(), "/projects");
        assert_eq!(
            shell.client().transport().operations(),
            ["user_login", "dir_list", "dir_list"]
        );
    }

    #[tokio::test]
    async fn test_cd_into_file_fails() {
        let mut shell = shell(vec![login_ok(), root_listing()]);
        shell.execute(parse("login admin admin123")).await;

        let Step::Output(text) = shell.execute(parse("cd readme.txt")).await else {
            panic!("unexpected quit");
        };

        assert!(text.contains("not a directory"));
        assert_eq!(shell.client().current_path(), "/");
    }

    #[tokio::test]
    async fn test_rm_unknown_name_refreshes_once() {
        let mut shell = shell(vec![login_ok(), root_listing(), root_listing()]);
        shell.execute(parse("login admin admin123")).await;

        let step = shell.execute(parse("rm missing.txt")).await;

        assert_eq!(step, Step::Output("error: no such entry: missing.txt".into()));
        assert_eq!(
            shell.client().transport().operations(),
            ["user_login", "dir_list", "dir_list"]
        );
    }

    #[tokio::test]
    async fn test_mkdir_refreshes_listing() {
        let mut shell = shell(vec![
            login_ok(),
            empty_listing(),
            json!({ "status": "success", "data": {} }),
            json!({ "status": "success", "data": { "files": [{ "name": "new", "type": "dir" }] } }),
        ]);
        shell.execute(parse("login admin admin123")).await;

        let step = shell.execute(parse("mkdir new")).await;

        assert_eq!(step, Step::Output("created new/\nnew/".into()));
        assert_eq!(shell.listing(), [DirectoryEntry::directory("new")]);
    }

    #[tokio::test]
    async fn test_commands_while_logged_out() {
        let mut shell = shell(vec![]);
        assert_eq!(
            shell.execute(Command::List).await,
            Step::Output("error: not logged in".into())
        );
        assert_eq!(
            shell.execute(Command::Whoami).await,
            Step::Output("not logged in".into())
        );
        assert_eq!(shell.prompt(), "guest@ofs:/> ");
        assert!(shell.client().transport().operations().is_empty());
    }

    #[tokio::test]
    async fn test_run_reads_until_quit() {
        let mut shell = shell(vec![login_ok(), root_listing()]);
        let input: &[u8] = b"\nlogin admin admin123\nbogus\npwd\nquit\nls\n";
        let mut output = Vec::new();

        shell.run(input, &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("logged in as admin"));
        assert!(output.contains("unknown command: bogus"));
        assert!(output.contains("admin@ofs:/> /\n"));
        // `ls` after quit is never executed
        assert_eq!(
            shell.client().transport().operations(),
            ["user_login", "dir_list"]
        );
    }
}
