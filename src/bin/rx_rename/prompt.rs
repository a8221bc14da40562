//! Thin wrappers around `dialoguer` prompts.

use std::fmt::Display;
use std::str::FromStr;

use anyhow::Result;
use dialoguer::{Confirm, Input, Select};

/// Ask for a value that must not be empty.
pub fn text(prompt: &str) -> Result<String> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Value cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    Ok(input.trim().to_string())
}

/// Ask for a value, accepting an empty answer.
pub fn optional_text(prompt: &str) -> Result<String> {
    let input: String = Input::new().with_prompt(prompt).allow_empty(true).interact_text()?;
    Ok(input.trim().to_string())
}

/// Ask for a value with a default used on empty input.
pub fn text_with_default(prompt: &str, default: &str) -> Result<String> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()?;

    Ok(input.trim().to_string())
}

/// Ask for a non-negative number. Invalid input is re-prompted.
pub fn number<T>(prompt: &str, default: T) -> Result<T>
where
    T: Clone + Display + FromStr,
    <T as FromStr>::Err: Display,
{
    Ok(Input::<T>::new().with_prompt(prompt).default(default).interact_text()?)
}

/// Pick one of the given items and return its index.
pub fn select<T: Display>(prompt: &str, items: &[T]) -> Result<usize> {
    Ok(Select::new().with_prompt(prompt).items(items).default(0).interact()?)
}

/// Ask a yes or no question.
pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(default).interact()?)
}
