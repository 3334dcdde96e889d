mod in_memory_state;

pub use in_memory_state::InMemoryStateStore;
