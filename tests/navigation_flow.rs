//! End-to-end navigation through the shell: link clicks, history
//! traversal, and route activation under a base path.

use std::sync::{Arc, Mutex};

use view_router::transition::Transition;
use view_router::view::ClickOutcome;
use view_router::{Shell, Step};

mod common;

fn active(shell: &Shell) -> Vec<String> {
    shell.active_routes().into_iter().map(|r| r.name).collect()
}

async fn settle(transition: Option<Transition>) {
    let transition = transition.expect("navigation should run inside a transition");
    assert_eq!(transition.finished().wait().await, Ok(()));
}

#[tokio::test]
async fn test_history_round_trip_restores_routes() {
    let shell = Shell::from_config(&common::video_site()).unwrap();
    assert_eq!(shell.document().base_path(), "/app");
    assert_eq!(active(&shell), vec!["home"]);

    settle(shell.navigate("/video/1").unwrap()).await;
    assert_eq!(shell.document().location_path(), "/app/video/1");
    assert_eq!(active(&shell), vec!["video", "detail"]);

    settle(shell.navigate("/about").unwrap()).await;
    assert_eq!(active(&shell), vec!["about"]);

    settle(Some(shell.back())).await;
    assert_eq!(active(&shell), vec!["video", "detail"]);

    settle(Some(shell.back())).await;
    assert_eq!(active(&shell), vec!["home"]);

    settle(shell.replay(&Step::Forward).unwrap()).await;
    assert_eq!(shell.document().location_path(), "/app/video/1");
    let detail = shell.active_routes().pop().unwrap();
    assert_eq!(detail.matched.param("id"), Some("1"));
    assert_eq!(shell.document().history_len(), 3);
}

#[tokio::test]
async fn test_capture_changes_notify_with_new_id() {
    let shell = Shell::from_config(&common::video_site()).unwrap();
    let video = shell.route_node("video").unwrap();
    let detail = shell.route_node("detail").unwrap();

    let ids = Arc::new(Mutex::new(Vec::new()));
    let seen = ids.clone();
    shell
        .host()
        .on_route_change(detail, move |change| {
            seen.lock().unwrap().push(change.matched.param("id").map(str::to_string));
        })
        .unwrap();

    let targets = Arc::new(Mutex::new(Vec::new()));
    let seen = targets.clone();
    shell
        .host()
        .on_route_change(video, move |change| {
            assert_eq!(change.current_target, video);
            seen.lock().unwrap().push(change.target);
        })
        .unwrap();

    settle(shell.navigate("/video/1").unwrap()).await;
    settle(shell.navigate("/video/2").unwrap()).await;
    // same location again: nothing changes, nothing fires
    settle(shell.navigate("/video/2").unwrap()).await;

    assert_eq!(
        *ids.lock().unwrap(),
        vec![Some("1".to_string()), Some("2".to_string())]
    );
    assert_eq!(*targets.lock().unwrap(), vec![video, detail, detail]);
}

#[tokio::test]
async fn test_exact_and_wildcard() {
    let shell = Shell::from_config(&common::video_site()).unwrap();

    settle(shell.navigate("/about/team").unwrap()).await;
    assert_eq!(active(&shell), vec!["missing"]);
    let missing = shell.active_routes().pop().unwrap();
    assert!(missing.matched.is_wildcard());

    settle(shell.navigate("/about").unwrap()).await;
    assert_eq!(active(&shell), vec!["about"]);
}

#[tokio::test]
async fn test_links_outside_nav_are_not_intercepted() {
    let shell = Shell::from_config(&common::video_site()).unwrap();
    let host = shell.host();
    let footer = host.append_container(host.root(), "footer").unwrap();
    let link = host.append_anchor(footer, Some("/about")).unwrap();

    assert_eq!(host.click(link).unwrap(), ClickOutcome::Ignored);
    assert_eq!(shell.document().location_path(), "/app/index.html");
    assert!(!shell.scheduler().transition_is_pending());
}

#[tokio::test]
async fn test_navigation_pushes_exactly_once() {
    let shell = Shell::from_config(&common::video_site()).unwrap();
    let mut notices = shell.scheduler().subscribe();

    let transition = shell.navigate("/video").unwrap().unwrap();
    assert_eq!(transition.transition_type(), Some("navigate"));
    settle(Some(transition)).await;

    assert_eq!(shell.document().history_len(), 2);
    assert!(matches!(
        notices.recv().await.unwrap(),
        view_router::transition::TransitionNotice::Started { transition_type: Some(ref t), .. } if t == "navigate"
    ));
}
