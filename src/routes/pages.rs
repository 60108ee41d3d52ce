//! The static site. Every page is a plain file in the frontend
//! directory; unknown paths get the main page, whatever the method,
//! so client-side links keep working.

use std::path::PathBuf;

use warp::path::end;
use warp::{fs, get, path as p, Filter};

use super::{boxed, Route};

pub const INDEX_PAGE: &str = "index.html";
pub const REGISTER_PAGE: &str = "register.html";
pub const SEARCH_PAGE: &str = "search.html";

pub fn make_pages_route(frontend_dir: PathBuf) -> Route {
    let index = frontend_dir.join(INDEX_PAGE);

    let root = get().and(end()).and(fs::file(index.clone()));
    let register = get()
        .and(p("register"))
        .and(end())
        .and(fs::file(frontend_dir.join(REGISTER_PAGE)));
    let search = get()
        .and(p("search"))
        .and(end())
        .and(fs::file(frontend_dir.join(SEARCH_PAGE)));
    let files = get().and(fs::dir(frontend_dir));
    let fallback = fs::file(index);

    root.or(register)
        .unify()
        .or(search)
        .unify()
        .or(files)
        .unify()
        .or(fallback)
        .unify()
        .map(boxed)
        .boxed()
}
