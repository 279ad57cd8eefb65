use log::{error, info};
use reqwest::Response;

use super::{Error, Result, TokenStore, ViewUpdate};
use crate::memo::{Memo, MemoBody, MemoId};
use crate::time::MemoDate;
use crate::user::{Login, LoginSuccess, Message, Profile, Register};

/// Talks to a memosync server on behalf of one user.
///
/// Each call is a single attempt: failures are returned (and, for the
/// view-driving calls, shown through [`ViewUpdate::alert`]), never retried.
pub struct Client<S> {
    http: reqwest::Client,
    url: String,
    store: S,
}

impl<S: TokenStore> Client<S> {
    pub fn new(url: impl Into<String>, store: S) -> Self {
        let url = url.into().trim_end_matches('/').to_string();

        Self {
            http: reqwest::Client::new(),
            url,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    fn bearer(&self) -> Result<String> {
        self.store
            .get()?
            .map(|token| format!("Bearer {token}"))
            .ok_or(Error::MissingToken)
    }

    async fn check(res: Response) -> Result<Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let message = match res.json::<Message>().await {
            Ok(Message { message }) => message,
            Err(_) => status.canonical_reason().unwrap_or("error").to_string(),
        };
        Err(Error::Status(status, message))
    }
}

impl<S: TokenStore> Client<S> {
    pub async fn register(&self, login: &str, name: &str, pwd: &str, pwd2: &str) -> Result<()> {
        let body = Register {
            login: Some(login.into()),
            name: Some(name.into()),
            pwd: Some(pwd.into()),
            pwd2: Some(pwd2.into()),
        };

        let res = self
            .http
            .post(self.endpoint("/users/register"))
            .json(&body)
            .send()
            .await?;
        Self::check(res).await?;

        info!("registered {login}");
        Ok(())
    }

    /// Logs in and keeps the issued token, returning the user's display name.
    pub async fn login(&self, login: &str, pwd: &str) -> Result<String> {
        let body = Login {
            login: Some(login.into()),
            pwd: Some(pwd.into()),
        };

        let res = self
            .http
            .post(self.endpoint("/users/login"))
            .json(&body)
            .send()
            .await?;
        let LoginSuccess { name, token, .. } = Self::check(res).await?.json().await?;

        self.store.set(&token)?;
        info!("logged in as {login}");
        Ok(name)
    }

    /// The server keeps no session, forgetting the token is the logout.
    pub async fn logout(&self) -> Result<()> {
        let res = self
            .http
            .post(self.endpoint("/users/logout"))
            .send()
            .await?;
        Self::check(res).await?;

        self.store.remove()?;
        Ok(())
    }

    pub async fn fetch_memos(&self, nbr: Option<usize>) -> Result<Vec<Memo>> {
        let mut req = self
            .http
            .get(self.endpoint("/memos"))
            .header("authorization", self.bearer()?);
        if let Some(nbr) = nbr {
            req = req.query(&[("nbr", nbr)]);
        }

        let res = req.send().await?;
        Ok(Self::check(res).await?.json().await?)
    }

    pub async fn create_memo(&self, content: &str) -> Result<Memo> {
        let res = self
            .http
            .post(self.endpoint("/memos"))
            .header("authorization", self.bearer()?)
            .json(&MemoBody::new(content, MemoDate::now()))
            .send()
            .await?;

        Ok(Self::check(res).await?.json().await?)
    }

    pub async fn update_memo(&self, id: MemoId, content: &str) -> Result<Profile> {
        let res = self
            .http
            .put(self.endpoint(&format!("/memos/{id}")))
            .header("authorization", self.bearer()?)
            .json(&MemoBody::new(content, MemoDate::now()))
            .send()
            .await?;

        Ok(Self::check(res).await?.json().await?)
    }

    pub async fn remove_memo(&self, id: MemoId) -> Result<Profile> {
        let res = self
            .http
            .delete(self.endpoint(&format!("/memos/{id}")))
            .header("authorization", self.bearer()?)
            .send()
            .await?;

        Ok(Self::check(res).await?.json().await?)
    }
}

fn report<T>(ui: &mut impl ViewUpdate, what: &str, r: Result<T>) -> Result<T> {
    if let Err(ref e) = r {
        error!("{what}: {e}");
        ui.alert(&e.to_string());
    }
    r
}

impl<S: TokenStore> Client<S> {
    pub async fn load(&self, ui: &mut impl ViewUpdate) -> Result<()> {
        ui.loading(true);
        let memos = self.fetch_memos(None).await;
        ui.loading(false);

        for memo in report(ui, "loading memos", memos)? {
            ui.on_memo_added(&memo);
        }
        Ok(())
    }

    pub async fn add_memo(&self, content: &str, ui: &mut impl ViewUpdate) -> Result<()> {
        let memo = report(ui, "adding memo", self.create_memo(content).await)?;
        ui.on_memo_added(&memo);
        Ok(())
    }

    pub async fn delete_memo(&self, id: MemoId, ui: &mut impl ViewUpdate) -> Result<()> {
        report(ui, "deleting memo", self.remove_memo(id).await)?;
        ui.on_memo_removed(id);
        Ok(())
    }

    pub async fn modify_memo(
        &self,
        id: MemoId,
        content: &str,
        ui: &mut impl ViewUpdate,
    ) -> Result<()> {
        report(ui, "modifying memo", self.update_memo(id, content).await)?;
        ui.on_memo_updated(id, content);
        Ok(())
    }
}
