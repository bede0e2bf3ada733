mod support;

use taskflow::repository::QuerySpec;
use taskflow::task::{NewTask, Priority, StatusFilter};
use taskflow::views::{CompletedView, TodoListView, View, WelcomeView};

use support::{memory_repo, snapshot, texts, WAIT};

/// Apply updates until `$done` holds, failing after [`WAIT`].
macro_rules! until {
    ($view:ident, $done:expr) => {
        tokio::time::timeout(WAIT, async {
            while !$done {
                assert!($view.next_update().await, "view stopped delivering updates");
            }
        })
        .await
        .expect("view update timed out")
    };
}

#[tokio::test]
async fn todo_list_loads_and_adds_through_the_form() {
    let (_, repo) = memory_repo();
    let mut view = TodoListView::new(repo, Priority::High);
    view.mount();
    until!(view, view.loaded());
    assert!(view.visible().is_empty());

    view.form.text = "  Call mom ".to_string();
    view.form.category = "family".to_string();
    assert!(view.submit());
    assert!(view.loading());

    until!(view, !view.loading() && view.visible().len() == 1);
    let task = &view.visible()[0];
    assert_eq!(task.text, "Call mom");
    assert_eq!(task.category.as_deref(), Some("family"));
    assert_eq!(task.priority, Priority::High);
    assert!(view.form.text.is_empty());
    assert_eq!(view.form.priority, Priority::High);
    assert_eq!(view.error(), None);
}

#[tokio::test]
async fn empty_form_is_rejected_inline() {
    let (store, repo) = memory_repo();
    let mut view = TodoListView::new(repo, Priority::Medium);
    view.mount();
    view.form.text = "   ".to_string();
    assert!(!view.submit());
    assert!(!view.loading());
    assert_eq!(view.error(), Some("Task cannot be empty"));
    assert!(store.is_empty("todos"));
}

#[tokio::test]
async fn toggle_and_filter_happen_in_the_list() {
    let (_, repo) = memory_repo();
    repo.add(NewTask::new("first")).await.expect("add");
    let second = repo.add(NewTask::new("second")).await.expect("add");

    let mut view = TodoListView::new(repo, Priority::Medium);
    view.mount();
    until!(view, view.tasks().len() == 2);

    view.toggle(&second);
    until!(view, view.tasks().iter().any(|task| task.completed));

    view.set_filter(StatusFilter::Active);
    assert_eq!(texts(view.visible()), ["first"]);
    view.cycle_filter();
    assert_eq!(view.filter(), StatusFilter::Completed);
    assert_eq!(texts(view.visible()), ["second"]);
    view.cycle_filter();
    assert_eq!(view.visible().len(), 2);
}

#[tokio::test]
async fn search_reopens_the_subscription() {
    let (_, repo) = memory_repo();
    for text in ["Banana", "Apple", "apple pie"] {
        repo.add(NewTask::new(text)).await.expect("add");
    }

    let mut view = TodoListView::new(repo, Priority::Medium);
    view.mount();
    until!(view, view.tasks().len() == 3);

    view.set_search("Ap");
    assert!(!view.loaded());
    until!(view, view.loaded());
    assert_eq!(texts(view.visible()), ["Apple"]);

    view.set_search("");
    until!(view, view.loaded());
    assert_eq!(texts(view.visible()), ["apple pie", "Apple", "Banana"]);
}

#[tokio::test]
async fn unmounted_list_stops_receiving() {
    let (_, repo) = memory_repo();
    let mut view = TodoListView::new(repo.clone(), Priority::Medium);
    view.mount();
    until!(view, view.loaded());

    view.unmount();
    assert!(!view.is_mounted());
    repo.add(NewTask::new("unseen")).await.expect("add");
    tokio::task::yield_now().await;

    assert!(!view.next_update().await);
    assert!(!view.poll());
    assert!(view.tasks().is_empty());
}

#[tokio::test]
async fn store_failures_become_inline_messages() {
    let (store, repo) = memory_repo();
    store.set_offline(true);

    let mut view = TodoListView::new(repo, Priority::Medium);
    view.mount();
    until!(view, view.error().is_some());
    assert_eq!(
        view.error(),
        Some("Failed to load tasks: Store unavailable: store unavailable")
    );

    view.clear_error();
    view.form.text = "Offline task".to_string();
    assert!(view.submit());
    until!(view, !view.loading());
    let error = view.error().expect("add error");
    assert!(error.starts_with("Failed to add task:"), "{error}");
    assert_eq!(view.form.text, "Offline task");
}

#[tokio::test]
async fn completed_view_shows_only_completed_tasks() {
    let (_, repo) = memory_repo();
    let done = repo.add(NewTask::new("done")).await.expect("add");
    repo.add(NewTask::new("pending")).await.expect("add");
    snapshot(&repo, &QuerySpec::all()).await;
    repo.toggle_complete(&done).await.expect("toggle");

    let mut view = CompletedView::new(repo);
    view.mount();
    until!(view, view.loaded());
    assert_eq!(texts(view.tasks()), ["done"]);

    view.remove(&done);
    until!(view, view.tasks().is_empty());
    assert_eq!(view.error(), None);
}

#[tokio::test]
async fn welcome_counts_completed_on_mount() {
    let (_, repo) = memory_repo();
    let done = repo.add(NewTask::new("done")).await.expect("add");
    snapshot(&repo, &QuerySpec::all()).await;
    repo.toggle_complete(&done).await.expect("toggle");

    let mut view = WelcomeView::new(repo);
    view.mount();
    assert_eq!(view.completed_count(), 0);
    assert!(!view.formatted_date().is_empty());
    until!(view, view.completed_count() == 1);

    view.toggle_menu();
    assert!(view.menu_open());
    view.unmount();
    view.mount();
    assert!(!view.menu_open());
}

#[tokio::test]
async fn welcome_swallows_count_failures() {
    let (store, repo) = memory_repo();
    store.set_offline(true);
    let mut view = WelcomeView::new(repo);
    view.mount();
    assert!(view.next_update().await);
    assert_eq!(view.completed_count(), 0);
    assert_eq!(view.error(), None);
}

#[tokio::test]
async fn remounted_list_starts_fresh() {
    let (store, repo) = memory_repo();
    let mut view = TodoListView::new(repo, Priority::Low);
    view.mount();
    until!(view, view.loaded());

    view.set_search("Zz");
    view.set_filter(StatusFilter::Completed);
    store.set_offline(true);
    view.form.text = "x".to_string();
    view.form.priority = Priority::High;
    assert!(view.submit());
    until!(view, !view.loading());
    assert!(view.error().is_some());

    view.unmount();
    store.set_offline(false);
    view.mount();
    assert_eq!(view.search(), "");
    assert_eq!(view.filter(), StatusFilter::All);
    assert_eq!(view.error(), None);
    assert!(view.form.text.is_empty());
    assert_eq!(view.form.priority, Priority::Low);
    assert!(view.tasks().is_empty());
    until!(view, view.loaded());
    assert_eq!(view.error(), None);
}

#[tokio::test]
async fn remounted_completed_view_clears_errors() {
    let (store, repo) = memory_repo();
    store.set_offline(true);
    let mut view = CompletedView::new(repo);
    view.mount();
    until!(view, view.error().is_some());

    view.unmount();
    store.set_offline(false);
    view.mount();
    assert_eq!(view.error(), None);
    until!(view, view.loaded());
    assert_eq!(view.error(), None);
}

#[tokio::test]
async fn submit_is_ignored_while_an_add_is_in_flight() {
    let (store, repo) = memory_repo();
    let mut view = TodoListView::new(repo, Priority::Medium);
    view.mount();
    view.form.text = "Once".to_string();
    assert!(view.submit());
    assert!(view.loading());
    assert!(!view.submit());

    until!(view, !view.loading());
    assert_eq!(store.len("todos"), 1);
    assert!(view.form.text.is_empty());
}
