use std::fmt;

use log::{debug, warn};

use super::{Client, Result, TokenStore};
use crate::memo::{Memo, MemoId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Welcome,
    Login,
    Register,
    Application,
}

impl View {
    pub const ALL: [View; 4] = [View::Welcome, View::Login, View::Register, View::Application];

    pub fn fragment(self) -> &'static str {
        match self {
            View::Welcome => "#welcome",
            View::Login => "#login",
            View::Register => "#register",
            View::Application => "#application",
        }
    }

    /// An empty fragment is the landing page.
    pub fn from_fragment(fragment: &str) -> Option<Self> {
        if fragment.is_empty() || fragment == "#" {
            return Some(View::Welcome);
        }

        Self::ALL.into_iter().find(|v| v.fragment() == fragment)
    }
}

impl fmt::Display for View {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.fragment())
    }
}

/// Whatever renders the client: a page, a terminal, a test recorder.
pub trait ViewUpdate {
    fn on_memo_added(&mut self, memo: &Memo);
    fn on_memo_removed(&mut self, id: MemoId);
    fn on_memo_updated(&mut self, id: MemoId, content: &str);

    fn clear_memos(&mut self);

    /// Show `view`, hide every other one and mark its navigation entry.
    fn show(&mut self, view: View);

    /// `Some(name)` once logged in, `None` after logout.
    fn logged_in(&mut self, name: Option<&str>);

    fn alert(&mut self, message: &str);

    fn loading(&mut self, _busy: bool) {}
}

#[derive(Debug, Default, Clone)]
pub struct LoginForm {
    pub login: String,
    pub pwd: String,
}

#[derive(Debug, Default, Clone)]
pub struct RegisterForm {
    pub email: String,
    pub name: String,
    pub pwd: String,
    pub pwd2: String,
}

pub struct ViewController<S, U> {
    client: Client<S>,
    ui: U,
    current: View,
    pub login_form: LoginForm,
    pub register_form: RegisterForm,
    pub memo_input: String,
}

impl<S: TokenStore, U: ViewUpdate> ViewController<S, U> {
    pub fn new(client: Client<S>, ui: U) -> Self {
        Self {
            client,
            ui,
            current: View::Welcome,
            login_form: Default::default(),
            register_form: Default::default(),
            memo_input: String::new(),
        }
    }

    pub fn current(&self) -> View {
        self.current
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn client(&self) -> &Client<S> {
        &self.client
    }

    pub async fn navigate(&mut self, fragment: &str) {
        let view = View::from_fragment(fragment).unwrap_or_else(|| {
            warn!("unknown view {fragment:?}, showing the welcome page");
            View::Welcome
        });
        debug!("navigating to {view}");

        if view == View::Application {
            self.ui.clear_memos();
            // failures were already alerted
            let _ = self.client.load(&mut self.ui).await;
        }

        self.ui.show(view);
        self.current = view;
    }

    pub async fn submit_login(&mut self) -> Result<()> {
        let LoginForm { login, pwd } = self.login_form.clone();
        if login.is_empty() || pwd.is_empty() {
            self.ui.alert("please complete all fields");
            return Ok(());
        }

        let name = match self.client.login(&login, &pwd).await {
            Ok(name) => name,
            Err(e) => {
                self.ui.alert(&format!("authentication failed: {e}"));
                return Err(e);
            }
        };

        self.ui.logged_in(Some(&name));
        self.navigate(View::Application.fragment()).await;
        self.login_form = Default::default();
        Ok(())
    }

    pub async fn submit_register(&mut self) -> Result<()> {
        let RegisterForm {
            email,
            name,
            pwd,
            pwd2,
        } = self.register_form.clone();

        if email.is_empty() || name.is_empty() || pwd.is_empty() || pwd2.is_empty() {
            self.ui.alert("please fill all inputs");
            return Ok(());
        }
        if pwd != pwd2 {
            self.ui.alert("passwords didn't match");
            return Ok(());
        }

        if let Err(e) = self.client.register(&email, &name, &pwd, &pwd2).await {
            self.ui.alert(&e.to_string());
            return Err(e);
        }

        self.ui.alert("success");
        self.navigate(View::Login.fragment()).await;
        self.register_form = Default::default();
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<()> {
        if let Err(e) = self.client.logout().await {
            self.ui.alert(&format!("logout failed: {e}"));
            return Err(e);
        }

        self.ui.logged_in(None);
        self.navigate(View::Login.fragment()).await;
        Ok(())
    }

    pub async fn add(&mut self) -> Result<()> {
        if self.memo_input.is_empty() {
            self.ui.alert("please provide a content for your memo");
            return Ok(());
        }

        self.client.add_memo(&self.memo_input, &mut self.ui).await
    }

    pub fn reset(&mut self) {
        self.memo_input.clear();
    }

    pub async fn delete(&mut self, id: MemoId) -> Result<()> {
        self.client.delete_memo(id, &mut self.ui).await
    }

    /// Replaces the memo's content with the memo input.
    pub async fn modify(&mut self, id: MemoId) -> Result<()> {
        self.client
            .modify_memo(id, &self.memo_input, &mut self.ui)
            .await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::net::SocketAddr;

    use crate::backend::test::Guard;
    use crate::client::{Error, MemoryTokenStore};
    use crate::memosync::test::create_memosync;
    use crate::routes::routes;

    #[derive(Default)]
    struct Recorder {
        rows: Vec<(MemoId, String)>,
        alerts: Vec<String>,
        shown: Vec<View>,
        user: Option<String>,
    }

    impl ViewUpdate for Recorder {
        fn on_memo_added(&mut self, memo: &Memo) {
            self.rows.push((memo.id, memo.content.clone()));
        }

        fn on_memo_removed(&mut self, id: MemoId) {
            self.rows.retain(|(row, _)| *row != id);
        }

        fn on_memo_updated(&mut self, id: MemoId, content: &str) {
            for row in self.rows.iter_mut().filter(|(row, _)| *row == id) {
                row.1 = content.into();
            }
        }

        fn clear_memos(&mut self) {
            self.rows.clear();
        }

        fn show(&mut self, view: View) {
            self.shown.push(view);
        }

        fn logged_in(&mut self, name: Option<&str>) {
            self.user = name.map(Into::into);
        }

        fn alert(&mut self, message: &str) {
            self.alerts.push(message.into());
        }
    }

    async fn serve() -> (SocketAddr, Guard) {
        let (sync, guard) = create_memosync().await;
        let (addr, server) = warp::serve(routes(sync)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        (addr, guard)
    }

    fn controller(addr: SocketAddr) -> ViewController<MemoryTokenStore, Recorder> {
        let client = Client::new(format!("http://{addr}"), MemoryTokenStore::default());
        ViewController::new(client, Recorder::default())
    }

    async fn logged_in(addr: SocketAddr) -> ViewController<MemoryTokenStore, Recorder> {
        let mut app = controller(addr);

        app.register_form = RegisterForm {
            email: "a@x.com".into(),
            name: "Al".into(),
            pwd: "p1".into(),
            pwd2: "p1".into(),
        };
        app.submit_register().await.unwrap();

        app.login_form = LoginForm {
            login: "a@x.com".into(),
            pwd: "p1".into(),
        };
        app.submit_login().await.unwrap();
        app
    }

    #[test]
    fn fragments() {
        assert_eq!(View::from_fragment(""), Some(View::Welcome));
        assert_eq!(View::from_fragment("#application"), Some(View::Application));
        assert_eq!(View::from_fragment("#elsewhere"), None);
        for view in View::ALL {
            assert_eq!(View::from_fragment(view.fragment()), Some(view));
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let (addr, _guard) = serve().await;
        let app = logged_in(addr).await;

        let ui = app.ui();
        assert_eq!(ui.alerts, ["success"]);
        assert_eq!(ui.shown, [View::Login, View::Application]);
        assert_eq!(ui.user.as_deref(), Some("Al"));
        assert_eq!(app.current(), View::Application);
        assert!(app.register_form.email.is_empty());
        assert!(app.login_form.pwd.is_empty());
        assert!(app.client().store().get().unwrap().is_some());
    }

    #[tokio::test]
    async fn form_checks_happen_before_any_request() {
        // nothing listens here; a request would fail with an Http error
        let mut app = controller(([127, 0, 0, 1], 9).into());

        app.register_form = RegisterForm {
            email: "a@x.com".into(),
            name: "Al".into(),
            pwd: "p1".into(),
            pwd2: "p2".into(),
        };
        app.submit_register().await.unwrap();

        app.login_form.login = "a@x.com".into();
        app.submit_login().await.unwrap();

        app.add().await.unwrap();

        assert_eq!(
            app.ui().alerts,
            [
                "passwords didn't match",
                "please complete all fields",
                "please provide a content for your memo",
            ]
        );
        assert_eq!(app.register_form.pwd2, "p2", "form kept on failure");
    }

    #[tokio::test]
    async fn memo_lifecycle() {
        let (addr, _guard) = serve().await;
        let mut app = logged_in(addr).await;

        for content in ["one", "two", "three"] {
            app.memo_input = content.into();
            app.add().await.unwrap();
        }
        let ids: Vec<_> = app.ui().rows.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids.len(), 3);

        app.memo_input = "deux".into();
        app.modify(ids[1]).await.unwrap();
        app.delete(ids[0]).await.unwrap();

        app.reset();
        assert!(app.memo_input.is_empty());

        // reloading from the server matches what the callbacks drew
        let drawn = app.ui().rows.clone();
        app.navigate("#application").await;
        assert_eq!(app.ui().rows, drawn);
        assert_eq!(
            drawn.iter().map(|(_, c)| c.as_str()).collect::<Vec<_>>(),
            ["deux", "three"]
        );

        let two = app.client().fetch_memos(Some(1)).await.unwrap();
        assert_eq!(two.len(), 1);
        assert_eq!(two[0].id, ids[1]);
    }

    #[tokio::test]
    async fn failures_alert() {
        let (addr, _guard) = serve().await;
        let mut app = logged_in(addr).await;
        let alerts = app.ui().alerts.len();

        let err = app.delete(MemoId::new()).await.unwrap_err();
        assert!(matches!(err, Error::Status(status, _) if status.as_u16() == 404));
        assert_eq!(app.ui().alerts.len(), alerts + 1);
        assert!(app.ui().alerts[alerts].contains("memo not found"));
    }

    #[tokio::test]
    async fn logout_forgets_token() {
        let (addr, _guard) = serve().await;
        let mut app = logged_in(addr).await;

        app.logout().await.unwrap();
        assert_eq!(app.current(), View::Login);
        assert_eq!(app.ui().user, None);
        assert_eq!(app.client().store().get().unwrap(), None);

        app.memo_input = "after logout".into();
        let err = app.add().await.unwrap_err();
        assert!(matches!(err, Error::MissingToken));

        // unknown views land on the welcome page
        app.navigate("#nowhere").await;
        assert_eq!(app.current(), View::Welcome);
    }
}
