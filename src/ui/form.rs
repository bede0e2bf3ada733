use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::task::Priority;
use crate::views::TaskForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Text,
    Category,
    DueDate,
    Priority,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Text,
        FormField::Category,
        FormField::DueDate,
        FormField::Priority,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Text => "Task",
            FormField::Category => "Category",
            FormField::DueDate => "Due date",
            FormField::Priority => "Priority",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            FormField::Text => "<required>",
            FormField::Category => "(optional)",
            FormField::DueDate => "YYYY-MM-DD (optional)",
            FormField::Priority => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    None,
    Cancel,
    Submit,
}

/// Key handling for the new-task form.
///
/// The field values live in the task list's [`TaskForm`]; this only tracks
/// which field has focus.
#[derive(Debug, Clone, Default)]
pub struct FormEditor {
    active: usize,
}

impl FormEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> FormField {
        FormField::ALL[self.active.min(FormField::ALL.len() - 1)]
    }

    pub fn handle_key(&mut self, form: &mut TaskForm, key: KeyEvent) -> FormAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('u') {
                match field_value_mut(form, self.active()) {
                    Some(value) => value.clear(),
                    None => form.priority = Priority::default(),
                }
            }
            return FormAction::None;
        }

        match key.code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Tab | KeyCode::Down => self.move_active(1),
            KeyCode::BackTab | KeyCode::Up => self.move_active(-1),
            KeyCode::Enter => {
                if self.active + 1 >= FormField::ALL.len() {
                    return FormAction::Submit;
                }
                self.move_active(1);
            }
            KeyCode::Left if self.active() == FormField::Priority => {
                form.priority = form.priority.cycle(-1);
            }
            KeyCode::Right if self.active() == FormField::Priority => {
                form.priority = form.priority.cycle(1);
            }
            KeyCode::Backspace => {
                if let Some(value) = field_value_mut(form, self.active()) {
                    value.pop();
                }
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                if let Some(value) = field_value_mut(form, self.active()) {
                    value.push(ch);
                }
            }
            _ => {}
        }
        FormAction::None
    }

    fn move_active(&mut self, delta: isize) {
        let len = FormField::ALL.len() as isize;
        self.active = (self.active as isize + delta).rem_euclid(len) as usize;
    }
}

fn field_value_mut(form: &mut TaskForm, field: FormField) -> Option<&mut String> {
    match field {
        FormField::Text => Some(&mut form.text),
        FormField::Category => Some(&mut form.category),
        FormField::DueDate => Some(&mut form.due_date),
        FormField::Priority => None,
    }
}

/// Current text of `field`
pub fn field_value(form: &TaskForm, field: FormField) -> String {
    match field {
        FormField::Text => form.text.clone(),
        FormField::Category => form.category.clone(),
        FormField::DueDate => form.due_date.clone(),
        FormField::Priority => form.priority.to_string(),
    }
}
