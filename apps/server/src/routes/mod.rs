mod configs;
mod health;
mod logs;
mod ping;
mod scheduler;

macros_utils::routes! {
    group health,
    group configs,
    group logs,
    group scheduler,
    group ping,
}
