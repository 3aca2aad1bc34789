//! Startup banner and exit summary.

use std::net::SocketAddr;

use crate::consts::{AUTHOR, REPO, format_wait};
use crate::identity::Identity;
use crate::limits::AdmissionSnapshot;
use crate::state::Limits;

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub identity: Identity,
    pub admin: bool,
    pub worker_url: &'a str,
    pub callback_url: &'a str,
    pub bind: SocketAddr,
    pub limits: Limits,
    pub output_dir: &'a str,
}

pub fn render_banner(info: &BannerInfo) -> String {
    format!(
        r#"
   ╔═══════════════════════════════════════╗
   ║           G E N R E L A Y             ║
   ║    prompts in, videos out, politely   ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   repo      {}
   user      {}{}
   worker    {}
   callback  {} (listening on {})
   limits    {} per {}, {} active per user, {} total
   output    {}
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        REPO,
        info.identity,
        if info.admin { " (admin)" } else { "" },
        info.worker_url,
        info.callback_url,
        info.bind,
        info.limits.max_requests,
        format_wait(info.limits.rate_window),
        info.limits.max_per_identity,
        info.limits.max_global,
        info.output_dir,
    )
}

pub fn print_banner(info: &BannerInfo) {
    println!("{}", render_banner(info));
}

/// Print what is still pending on exit.
pub fn print_session_summary(snapshot: AdmissionSnapshot) {
    if snapshot.identity_count > 0 {
        println!(
            "{} task(s) still pending; their results will be dropped.",
            snapshot.identity_count
        );
    }
    println!("goodbye.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_shows_session() {
        let info = BannerInfo {
            identity: Identity(8484686373),
            admin: true,
            worker_url: "https://worker.example",
            callback_url: "https://bot.example/webhook/result",
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            limits: Limits::default(),
            output_dir: "videos",
        };
        let text = render_banner(&info);
        assert!(text.contains("8484686373 (admin)"));
        assert!(text.contains("https://bot.example/webhook/result"));
        assert!(text.contains("5 per 3600s"));
        print_banner(&info);
    }

    #[test]
    fn print_session_summary_does_not_panic() {
        print_session_summary(AdmissionSnapshot {
            global_count: 2,
            max_global: 10,
            identity_count: 1,
            max_per_identity: 1,
        });
    }
}
