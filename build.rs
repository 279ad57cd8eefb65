#[allow(unreachable_code)]
fn main() {
    #[cfg(not(feature = "backend-sql"))]
    return;

    // embedded by sqlx::migrate!
    println!("cargo:rerun-if-changed=migrations");
}
