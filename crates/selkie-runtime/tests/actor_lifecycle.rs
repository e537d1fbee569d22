//! Lifecycle tests for links, monitors, trap_exit, and exit cascades
//!
//! Exercises the fate-sharing rules end to end:
//! - panics cascade through links, normal exits do not
//! - trap_exit turns deaths into observable messages
//! - monitors observe without sharing fate
//! - receive_timeout injects Timeout messages

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use selkie_runtime::{send, spawn, ExitReason, Message, Pid, Relation};

const WAIT: Duration = Duration::from_secs(2);

/// Spawn a worker that panics on its first user message
fn fused_bomb(ctx: &selkie_runtime::ActorContext) -> Pid {
    ctx.spawn_link(|mut ctx| async move {
        let _ = ctx.receive().await;
        panic!("induced fault");
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panic_cascades_through_link() {
    let (exit_tx, exit_rx) = oneshot::channel();

    // watcher --monitors--> middle --links--> bomb
    let _watcher = spawn(|mut ctx| async move {
        let middle = ctx.spawn_monitor(|mut ctx| async move {
            let bomb = fused_bomb(&ctx);
            send(&bomb, ()).await;
            // An untrapped link means the panic below kills this actor
            // inside receive; the loop never observes it.
            while ctx.receive().await.is_some() {}
        });
        loop {
            if let Some(Message::Exit(exit)) = ctx.receive().await {
                assert_eq!(exit.who, middle);
                let _ = exit_tx.send(exit);
                return;
            }
        }
    });

    let exit = tokio::time::timeout(WAIT, exit_rx)
        .await
        .expect("cascade did not reach the watcher")
        .unwrap();
    assert_eq!(exit.relation, Relation::Monitored);
    match exit.reason {
        ExitReason::Panicked { details } => assert!(details.contains("induced fault")),
        other => panic!("expected panic to cascade, got {}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deep_cascade_reaches_the_whole_chain() {
    let (exit_tx, exit_rx) = oneshot::channel();

    // watcher --monitors--> a --links--> b --links--> c, c panics.
    let _watcher = spawn(|mut ctx| async move {
        let a = ctx.spawn_monitor(|ctx| async move {
            let _b = ctx.spawn_link(|ctx| async move {
                let bomb = fused_bomb(&ctx);
                send(&bomb, ()).await;
                std::future::pending::<()>().await;
            });
            std::future::pending::<()>().await;
        });
        loop {
            if let Some(Message::Exit(exit)) = ctx.receive().await {
                assert_eq!(exit.who, a);
                let _ = exit_tx.send(exit.reason);
                return;
            }
        }
    });

    let reason = tokio::time::timeout(WAIT, exit_rx)
        .await
        .expect("cascade did not cross two links")
        .unwrap();
    assert!(matches!(reason, ExitReason::Panicked { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parked_actor_dies_at_its_await_point() {
    // The middle actors above sit in future::pending, never touching their
    // mailboxes; the cascade must abort them at that await point.
    let (done_tx, done_rx) = oneshot::channel();

    let _watcher = spawn(|mut ctx| async move {
        let parked = ctx.spawn_monitor(|ctx| async move {
            let bomb = fused_bomb(&ctx);
            send(&bomb, ()).await;
            std::future::pending::<()>().await;
        });
        loop {
            if let Some(Message::Exit(exit)) = ctx.receive().await {
                assert_eq!(exit.who, parked);
                let _ = done_tx.send(());
                return;
            }
        }
    });

    tokio::time::timeout(WAIT, done_rx)
        .await
        .expect("parked actor survived a lethal exit")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn trap_exit_observes_linked_death_and_survives() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

    let trapper = spawn(move |mut ctx| async move {
        ctx.trap_exit(true);
        let bomb = fused_bomb(&ctx);
        send(&bomb, ()).await;
        while let Some(message) = ctx.receive().await {
            match message {
                Message::Exit(exit) => {
                    let _ = seen_tx.send(format!("exit: {}", exit.reason));
                }
                Message::User(_) => {
                    let _ = seen_tx.send("user".to_string());
                }
                _ => {}
            }
        }
    });

    let first = tokio::time::timeout(WAIT, seen_rx.recv())
        .await
        .expect("trapped exit never arrived")
        .unwrap();
    assert!(first.starts_with("exit: panicked"), "got {}", first);

    // Still alive and receiving after the linked peer died.
    send(&trapper, ()).await;
    let second = tokio::time::timeout(WAIT, seen_rx.recv())
        .await
        .expect("trapping actor died with its peer")
        .unwrap();
    assert_eq!(second, "user");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn normal_exit_does_not_cascade() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

    let _parent = spawn(move |mut ctx| async move {
        // Untrapped, but a normal exit is informational, not lethal.
        let _child = ctx.spawn_link(|_ctx| async {});
        while let Some(message) = ctx.receive().await {
            match message {
                Message::Exit(exit) => {
                    let _ = seen_tx.send(exit.reason.clone());
                }
                _ => {}
            }
        }
    });

    let reason = tokio::time::timeout(WAIT, seen_rx.recv())
        .await
        .expect("normal exit was not forwarded")
        .unwrap();
    assert!(reason.is_normal());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unlink_stops_the_cascade() {
    let (done_tx, done_rx) = oneshot::channel();

    let survivor = spawn(move |mut ctx| async move {
        let bomb = fused_bomb(&ctx);
        ctx.unlink(&bomb).await;
        send(&bomb, ()).await;
        // If the unlink failed, the panic would kill us in receive and
        // the probe message below would never be answered.
        while let Some(message) = ctx.receive().await {
            if matches!(message, Message::User(_)) {
                let _ = done_tx.send(());
                return;
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    send(&survivor, "probe".to_string()).await;
    tokio::time::timeout(WAIT, done_rx)
        .await
        .expect("unlinked actor died with its former peer")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demonitor_stops_notifications() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

    let _watcher = spawn(move |mut ctx| async move {
        let doomed = spawn(|mut ctx| async move {
            let _ = ctx.receive().await;
            panic!("unwatched fault");
        });
        ctx.monitor(&doomed).await;
        ctx.demonitor(&doomed).await;
        send(&doomed, ()).await;
        while let Some(message) = ctx.receive().await {
            if let Message::Exit(exit) = message {
                let _ = seen_tx.send(exit);
            }
        }
    });

    // No exit notification should arrive after the demonitor.
    let outcome = tokio::time::timeout(Duration::from_millis(300), seen_rx.recv()).await;
    assert!(outcome.is_err(), "demonitor did not take effect");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn receive_timeout_injects_timeout_message() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

    let pid = spawn(move |mut ctx| async move {
        loop {
            match ctx.receive_timeout(Duration::from_millis(50)).await {
                Some(Message::Timeout) => {
                    let _ = seen_tx.send("timeout".to_string());
                }
                Some(Message::User(payload)) => {
                    let _ = seen_tx.send(*payload.downcast::<String>().unwrap());
                }
                Some(_) => {}
                None => return,
            }
        }
    });

    let first = tokio::time::timeout(WAIT, seen_rx.recv())
        .await
        .expect("timeout message never arrived")
        .unwrap();
    assert_eq!(first, "timeout");

    // A real message resets the pattern; it must come through unchanged.
    send(&pid, "hello".to_string()).await;
    loop {
        let next = tokio::time::timeout(WAIT, seen_rx.recv())
            .await
            .expect("user message never arrived")
            .unwrap();
        if next == "hello" {
            break;
        }
        assert_eq!(next, "timeout");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pid_shutdown_kills_even_a_trapping_actor() {
    // Trapping softens shutdown *messages*, not the cancellation token.
    // Pid::shutdown is the hard kill and must win regardless.
    let (exit_tx, exit_rx) = oneshot::channel();

    let _watcher = spawn(move |mut ctx| async move {
        let stubborn = ctx.spawn_monitor(move |mut ctx| async move {
            ctx.trap_exit(true);
            while ctx.receive().await.is_some() {}
        });
        stubborn.shutdown();
        loop {
            if let Some(Message::Exit(exit)) = ctx.receive().await {
                assert_eq!(exit.who, stubborn);
                let _ = exit_tx.send(exit.reason);
                return;
            }
        }
    });

    let reason = tokio::time::timeout(WAIT, exit_rx)
        .await
        .expect("hard kill did not terminate the actor")
        .unwrap();
    assert_eq!(reason, ExitReason::Killed);
}
