use std::convert::Infallible;
use std::sync::Arc;

use log::error;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::memo::{MemoBody, MemoId, QueryMemos};
use crate::memosync::{Error, MemoSync, MemoSyncAuthed, NO_MEMO};
use crate::user::{Login, Message, Register};

pub fn routes(
    sync: Arc<MemoSync>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let hello = warp::path::end().and(warp::get()).map(|| "hi");

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allow_headers(vec!["content-type", "authorization"]);

    hello
        .or(users(Arc::clone(&sync)))
        .or(memos(sync))
        .recover(recover)
        .with(cors)
        .with(warp::log("memosync"))
}

fn with_sync(
    sync: Arc<MemoSync>,
) -> impl Filter<Extract = (Arc<MemoSync>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&sync))
}

fn authed(
    sync: Arc<MemoSync>,
) -> impl Filter<Extract = (MemoSyncAuthed,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_sync(sync))
        .and_then(|header: Option<String>, sync: Arc<MemoSync>| async move {
            sync.authenticate(header.as_deref())
                .map_err(warp::reject::custom)
        })
}

fn users(
    sync: Arc<MemoSync>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let register = warp::path!("users" / "register")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_sync(Arc::clone(&sync)))
        .and_then(|body: Register, sync: Arc<MemoSync>| async move {
            sync.register(body)
                .await
                .map(|()| {
                    warp::reply::with_status(
                        warp::reply::json(&Message::new("success")),
                        StatusCode::CREATED,
                    )
                })
                .map_err(warp::reject::custom)
        });

    let login = warp::path!("users" / "login")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_sync(Arc::clone(&sync)))
        .and_then(|body: Login, sync: Arc<MemoSync>| async move {
            sync.login(body)
                .await
                .map(|success| warp::reply::json(&success))
                .map_err(warp::reject::custom)
        });

    let logout = warp::path!("users" / "logout")
        .and(warp::post())
        .and(with_sync(sync))
        .map(|sync: Arc<MemoSync>| {
            sync.logout();
            warp::reply::json(&Message::new("User logged out successfully"))
        });

    register.or(login).or(logout)
}

fn memos(
    sync: Arc<MemoSync>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    // the token is checked before anything else about the request
    let memos = move || warp::path("memos").and(authed(Arc::clone(&sync)));

    let list = memos()
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<QueryMemos>())
        .and_then(|authed: MemoSyncAuthed, query: QueryMemos| async move {
            authed
                .list(query)
                .await
                .map(|memos| warp::reply::json(&memos))
                .map_err(warp::reject::custom)
        });

    let create = memos()
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and_then(|authed: MemoSyncAuthed, body: MemoBody| async move {
            authed
                .create(body)
                .await
                .map(|memo| warp::reply::json(&memo))
                .map_err(warp::reject::custom)
        });

    let update = memos()
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::put())
        .and(warp::body::json())
        .and_then(|authed: MemoSyncAuthed, id: String, body: MemoBody| async move {
            let id = memo_id(&id)?;
            authed
                .update(id, body)
                .await
                .map(|profile| warp::reply::json(&profile))
                .map_err(warp::reject::custom)
        });

    let delete = memos()
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::delete())
        .and_then(|authed: MemoSyncAuthed, id: String| async move {
            let id = memo_id(&id)?;
            authed
                .delete(id)
                .await
                .map(|profile| warp::reply::json(&profile))
                .map_err(warp::reject::custom)
        });

    list.or(create).unify().or(update).unify().or(delete).unify()
}

/// An id that can't be a memo id names no memo of the caller's.
fn memo_id(id: &str) -> Result<MemoId, Rejection> {
    id.parse()
        .map_err(|_| warp::reject::custom(Error::NotFound(NO_MEMO)))
}

async fn recover(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(e) = err.find::<Error>() {
        (StatusCode::from(e.clone()), e.message().to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::UnsupportedMediaType>() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".into())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".into())
    } else {
        error!("unhandled rejection: {err:?}");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&Message::new(message)),
        status,
    ))
}
