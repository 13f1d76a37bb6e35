//! Line-oriented interactive shell over the sync core.

use std::sync::Arc;

use authsync_api::{Credentials, ProfileUpdate, SignupRequest};
use authsync_core::{AuthStatus, AuthSyncCore, GuardView, InvalidationReason, ProfileView};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::app::TerminalNavigator;

const HELP: &str = "\
commands:
  status                           show the current status and nav bar
  login <id> <password>            sign in
  logout                           sign out
  signup <id> <password> <nick>    create an account
  nickname <value>                 change your nickname
  bio <value>                      change your bio
  focus                            re-check the session as if the window regained focus
  guard                            open the protected profile page
  help                             show this text
  quit                             exit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Empty,
    Status,
    Login { id: String, password: String },
    Logout,
    Signup { id: String, password: String, nickname: String },
    Nickname(String),
    Bio(String),
    Focus,
    Guard,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match (word, args.as_slice()) {
        ("", _) => Command::Empty,
        ("status", []) => Command::Status,
        ("login", [id, password]) => Command::Login {
            id: id.to_string(),
            password: password.to_string(),
        },
        ("logout", []) => Command::Logout,
        ("signup", [id, password, nickname @ ..]) if !nickname.is_empty() => Command::Signup {
            id: id.to_string(),
            password: password.to_string(),
            nickname: nickname.join(" "),
        },
        ("nickname", _) if !rest.is_empty() => Command::Nickname(rest.to_string()),
        ("bio", _) if !rest.is_empty() => Command::Bio(rest.to_string()),
        ("focus", []) => Command::Focus,
        ("guard", []) => Command::Guard,
        ("help", _) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        ("login" | "signup" | "nickname" | "bio", _) => {
            return Err(format!("wrong arguments for `{word}`, see `help`"))
        }
        _ => return Err(format!("unknown command: {word}")),
    };
    Ok(command)
}

/// Start the core and serve commands from stdin until `quit` or EOF.
pub async fn run(core: Arc<AuthSyncCore>, navigator: Arc<TerminalNavigator>) -> anyhow::Result<()> {
    let _subscription = core.subscribe(Box::new(|status: &AuthStatus| {
        println!("* status: {status}");
    }));
    core.start();

    println!("{}", core.nav_view());
    println!("type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => execute(&core, navigator.as_ref(), command).await,
            Err(message) => println!("{message}"),
        }
    }

    debug!("Shell input closed");
    Ok(())
}

async fn execute(core: &AuthSyncCore, navigator: &TerminalNavigator, command: Command) {
    match command {
        Command::Empty | Command::Quit => {}
        Command::Help => println!("{HELP}"),
        Command::Status => {
            let suffix = if core.is_indeterminate() {
                " (unconfirmed, server unreachable)"
            } else {
                ""
            };
            println!("{}{suffix}", core.get_status());
            println!("{}", core.nav_view());
        }
        Command::Login { id, password } => {
            match core.login(Credentials::new(id, password)).await {
                Ok(profile) => println!("Welcome, {}.", profile.display_name()),
                Err(err) => println!("Login failed: {}", err.user_message()),
            }
        }
        Command::Logout => {
            core.logout().await;
            println!("Signed out.");
        }
        Command::Signup {
            id,
            password,
            nickname,
        } => {
            let request = SignupRequest {
                id,
                password,
                nickname,
                profile_image_url: None,
            };
            match core.signup(request).await {
                Ok(()) => println!("Account created. You can log in now."),
                Err(err) => println!("Sign up failed: {}", err.user_message()),
            }
        }
        Command::Nickname(nickname) => {
            let update = ProfileUpdate {
                nickname: Some(nickname),
                ..ProfileUpdate::default()
            };
            report_update(core.update_profile(update).await);
        }
        Command::Bio(bio) => {
            let update = ProfileUpdate {
                bio: Some(bio),
                ..ProfileUpdate::default()
            };
            report_update(core.update_profile(update).await);
        }
        Command::Focus => core.trigger_reconcile(InvalidationReason::FocusRegained),
        Command::Guard => {
            core.trigger_reconcile(InvalidationReason::Navigation);
            let mut guard = core.guard();
            let mut reader = core.reader();
            match guard.resolve(&mut reader, navigator).await {
                GuardView::Render(_) => println!("{}", core.profile_view()),
                GuardView::Redirect(route) => println!("Please sign in first ({route})."),
                GuardView::Loading => println!("{}", ProfileView::Loading),
                GuardView::Nothing => {}
            }
        }
    }
}

fn report_update(result: authsync_core::ActionResult<authsync_api::Profile>) {
    match result {
        Ok(profile) => println!("Saved. Now showing as {}.", profile.display_name()),
        Err(err) => println!("Update failed: {}", err.user_message()),
    }
}
