//! Parsers for free-text generator output.

use snapchef_semantic_cache::{Nutrition, Recipe};

/// Ingredient lines mentioning these are advice, not ingredients.
const BULLET_SKIP: &[&str] = &["you can", "for an extra", "to make", "simply", "note:", "tip:"];

/// Same, for quantity-led lines.
const QUANTITY_SKIP: &[&str] = &["you can", "for an extra", "to make", "simply"];

/// Instruction lines mentioning these are advice, not steps.
const STEP_SKIP: &[&str] = &["you can also", "for an extra", "to make ahead", "tip:", "note:"];

const MAX_INGREDIENTS: usize = 12;
const MAX_STEPS: usize = 10;

/// Shortest line kept as an instruction, exclusive.
const MIN_STEP_CHARS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Ingredients,
    Instructions,
}

/// Parse a generated recipe into ingredient and instruction lists.
///
/// Returns `None` unless both lists come out non-empty.
pub fn parse_recipe(text: &str, food_name: &str, quantity_g: u32) -> Option<Recipe> {
    let mut section = None;
    let mut ingredients = Vec::new();
    let mut instructions = Vec::new();

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let lower = line.to_lowercase();

        if lower.contains("ingredient") && line.contains(':') {
            section = Some(Section::Ingredients);
            continue;
        }
        if contains_any(&lower, &["instruction", "method", "step"]) {
            section = Some(Section::Instructions);
            continue;
        }
        if contains_any(&lower, &["tip", "note", "variation"]) {
            break;
        }

        match section {
            Some(Section::Ingredients) => {
                if let Some(rest) = line.strip_prefix(['-', '•', '*']) {
                    let ingredient = rest.trim();
                    if !contains_any(&ingredient.to_lowercase(), BULLET_SKIP) {
                        ingredients.push(ingredient.to_string());
                    }
                } else if starts_with_quantity(line) && !contains_any(&lower, QUANTITY_SKIP) {
                    ingredients.push(line.to_string());
                }
            }
            Some(Section::Instructions) => {
                if line.chars().count() <= MIN_STEP_CHARS {
                    continue;
                }
                let step = strip_step_number(line);
                if !contains_any(&step.to_lowercase(), STEP_SKIP) {
                    instructions.push(step.to_string());
                }
            }
            None => {}
        }
    }

    if ingredients.is_empty() || instructions.is_empty() {
        return None;
    }

    ingredients.truncate(MAX_INGREDIENTS);
    instructions.truncate(MAX_STEPS);
    Some(Recipe {
        name: format!("{} Recipe", title_case(food_name)),
        ingredients,
        instructions,
        quantity: format!("{quantity_g}g"),
    })
}

/// Parse `Calories: / Protein: / Carbs: / Fat:` lines into per-100g values.
///
/// Returns `None` unless all four are present, or if any value is malformed.
pub fn parse_nutrition(text: &str) -> Option<Nutrition> {
    let mut calories = None;
    let mut protein = None;
    let mut carbs = None;
    let mut fat = None;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let lower = line.to_lowercase();
        let slot = if lower.starts_with("calories") {
            &mut calories
        } else if lower.starts_with("protein") {
            &mut protein
        } else if lower.starts_with("carbs") || lower.starts_with("carbohydrates") {
            &mut carbs
        } else if lower.starts_with("fat") {
            &mut fat
        } else {
            continue;
        };

        let Some(value) = line.split(':').nth(1) else {
            continue;
        };
        let token = value.split_whitespace().next()?;
        let digits: String = token
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if !digits.is_empty() {
            *slot = Some(digits.parse::<f64>().ok()?);
        }
    }

    Some(Nutrition {
        calories: calories?,
        protein: protein?,
        carbs: carbs?,
        fat: fat?,
    })
}

/// Capitalize the first letter of every alphabetic run, lowercase the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn starts_with_quantity(line: &str) -> bool {
    line.starts_with(|c: char| c.is_ascii_digit()) || line.starts_with("1/") || line.starts_with('½')
}

/// Drop a leading "3." style step number.
fn strip_step_number(line: &str) -> &str {
    let numbered = line.starts_with(|c: char| c.is_ascii_digit())
        && line.chars().take(3).any(|c| c == '.');
    match line.split_once('.') {
        Some((_, rest)) if numbered => rest.trim(),
        _ => line,
    }
}
