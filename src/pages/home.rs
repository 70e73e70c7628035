//! Landing page.

use crate::guard::Route;
use crate::state::session::AuthPhase;

pub const PRODUCT_NAME: &str = "PrintEase";

/// Where the landing page's call to action leads for the current session.
#[must_use]
pub fn next_route(phase: AuthPhase) -> Route {
    match phase {
        AuthPhase::Authenticated(kind) => Route::dashboard_for(kind),
        AuthPhase::Unknown | AuthPhase::Anonymous => Route::Auth,
    }
}
