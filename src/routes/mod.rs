/// Router Module Index
///
/// Organizes the routing surface into access-tier modules so the tier of
/// every path is visible at the routing layer, not buried in handlers.
///
/// Four modules:
/// - `public`: anonymous read access plus the signup/token gateway.
/// - `content`: the nested review/comment tree. Reads are anonymous; writes
///   authenticate through the `AuthUser` extractor on each mutating handler,
///   because the read and write methods share paths and cannot be split
///   across middleware-wrapped routers.
/// - `authenticated`: the self-service profile, wrapped in the auth
///   middleware.
/// - `admin`: user administration and catalog writes, nested under `/admin`.
pub mod admin;
pub mod authenticated;
pub mod content;
pub mod public;
