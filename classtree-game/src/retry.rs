//! Bounded attempt loops with an observable attempt count.

/// Result of a bounded retry: the accepted value, if any, and how many
/// attempts were spent getting there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: Option<T>,
    pub attempts: u32,
}

impl<T> Attempted<T> {
    #[must_use]
    pub const fn rejected(&self) -> u32 {
        match self.value {
            Some(_) => self.attempts.saturating_sub(1),
            None => self.attempts,
        }
    }
}

/// Call `attempt` with the attempt index until it yields a value or
/// `max_attempts` calls have been made.
pub fn retry_bounded<T, F>(max_attempts: u32, mut attempt: F) -> Attempted<T>
where
    F: FnMut(u32) -> Option<T>,
{
    for index in 0..max_attempts {
        if let Some(value) = attempt(index) {
            return Attempted {
                value: Some(value),
                attempts: index + 1,
            };
        }
    }
    Attempted {
        value: None,
        attempts: max_attempts,
    }
}

/// Produce candidates until one passes `accept`.
pub fn retry_until<T, P, A>(max_attempts: u32, mut produce: P, mut accept: A) -> Attempted<T>
where
    P: FnMut(u32) -> T,
    A: FnMut(&T) -> bool,
{
    retry_bounded(max_attempts, |index| {
        let candidate = produce(index);
        accept(&candidate).then_some(candidate)
    })
}
