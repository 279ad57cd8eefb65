use std::path::PathBuf;

use clap::Parser;
use log::error;
use tokio::io::{AsyncBufReadExt, BufReader};

use memosync::client::{Client, FileTokenStore, View, ViewController, ViewUpdate};
use memosync::memo::{Memo, MemoId};

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the memosync server.
    #[arg(short, long, env = "MEMOSYNC_URL", default_value = "http://127.0.0.1:30000")]
    url: String,

    /// Directory the session token is kept in.
    #[arg(short, long, env = "MEMOSYNC_TOKEN_DIR", default_value = ".")]
    token_dir: PathBuf,
}

/// Renders to stdout, one line per event.
struct Terminal;

impl ViewUpdate for Terminal {
    fn on_memo_added(&mut self, memo: &Memo) {
        println!("{}  {}  {}", memo.id, memo.date, memo.content);
    }

    fn on_memo_removed(&mut self, id: MemoId) {
        println!("removed {id}");
    }

    fn on_memo_updated(&mut self, id: MemoId, content: &str) {
        println!("{id}  {content}");
    }

    fn clear_memos(&mut self) {}

    fn show(&mut self, view: View) {
        println!("== {view}");
    }

    fn logged_in(&mut self, name: Option<&str>) {
        match name {
            Some(name) => println!("Logout({name})"),
            None => println!("logged out"),
        }
    }

    fn alert(&mut self, message: &str) {
        eprintln!("! {message}");
    }
}

const HELP: &str = "\
commands:
  #<view>                          welcome, login, register, application
  login <login> <pwd>
  register <login> <name> <pwd> <pwd2>
  logout
  add <content...>
  modify <id> <content...>
  delete <id>
  reset
  quit";

#[tokio::main]
async fn main() {
    let _ = dotenv::dotenv();
    pretty_env_logger::init();

    let args = Args::parse();
    let client = Client::new(args.url, FileTokenStore::new(args.token_dir));
    let mut app = ViewController::new(client, Terminal);

    app.navigate("").await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("reading stdin: {e}");
                break;
            }
        };

        let line = line.trim();
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let words = rest.split_whitespace().collect::<Vec<_>>();

        // failures have already been alerted
        let _ = match (cmd, &words[..]) {
            ("", _) => continue,
            ("quit", _) => break,
            (fragment, _) if fragment.starts_with('#') => {
                app.navigate(fragment).await;
                Ok(())
            }
            ("login", [login, pwd]) => {
                app.login_form.login = login.to_string();
                app.login_form.pwd = pwd.to_string();
                app.submit_login().await
            }
            ("register", [login, name, pwd, pwd2]) => {
                app.register_form.email = login.to_string();
                app.register_form.name = name.to_string();
                app.register_form.pwd = pwd.to_string();
                app.register_form.pwd2 = pwd2.to_string();
                app.submit_register().await
            }
            ("logout", []) => app.logout().await,
            ("add", _) => {
                app.memo_input = rest.trim().to_string();
                app.add().await
            }
            ("modify", [id, ..]) => match id.parse::<MemoId>() {
                Ok(id) => {
                    let content = rest.trim_start().split_once(' ').map_or("", |(_, c)| c);
                    app.memo_input = content.trim().to_string();
                    app.modify(id).await
                }
                Err(e) => {
                    eprintln!("! bad memo id: {e}");
                    Ok(())
                }
            },
            ("delete", [id]) => match id.parse::<MemoId>() {
                Ok(id) => app.delete(id).await,
                Err(e) => {
                    eprintln!("! bad memo id: {e}");
                    Ok(())
                }
            },
            ("reset", []) => {
                app.reset();
                Ok(())
            }
            _ => {
                println!("{HELP}");
                Ok(())
            }
        };
    }
}
