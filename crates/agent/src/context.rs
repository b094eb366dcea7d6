//! Conversation context serialized into the model prompt

/// System preamble describing the action block protocol
pub const DEFAULT_PREAMBLE: &str = "You are an autonomous coding agent. You can write files, run shell commands, and build software projects.
Respond only with ACTION blocks:

FILE: <relative/path>
```
<full file content>
```

SHELL:
```
<command>
```

MESSAGE:
<message>

Shell output is returned to you on the next turn.
Type DONE when the task is complete.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Preamble(String),
    Task(String),
    ShellOutput(String),
}

/// Ordered, append-only prompt segments: preamble, task, then shell outputs
#[derive(Debug, Clone)]
pub struct Context {
    segments: Vec<Segment>,
}

impl Context {
    pub fn new(preamble: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            segments: vec![
                Segment::Preamble(preamble.into()),
                Segment::Task(task.into()),
            ],
        }
    }

    pub fn with_default_preamble(task: impl Into<String>) -> Self {
        Self::new(DEFAULT_PREAMBLE, task)
    }

    pub fn push_shell_output(&mut self, output: impl Into<String>) {
        self.segments.push(Segment::ShellOutput(output.into()));
    }

    pub fn preamble(&self) -> &str {
        self.segments
            .iter()
            .find_map(|s| match s {
                Segment::Preamble(text) => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn task(&self) -> &str {
        self.segments
            .iter()
            .find_map(|s| match s {
                Segment::Task(text) => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Shell outputs in the order they were appended
    pub fn shell_outputs(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::ShellOutput(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn shell_output_count(&self) -> usize {
        self.shell_outputs().count()
    }

    fn head(&self) -> String {
        format!("SYSTEM:\n{}\nUSER TASK:\n{}\n", self.preamble(), self.task())
    }

    fn shell_block(output: &str) -> String {
        format!("\nSHELL OUTPUT:\n{}", output)
    }

    /// Full prompt with every segment
    pub fn render(&self) -> String {
        let mut prompt = self.head();
        for output in self.shell_outputs() {
            prompt.push_str(&Self::shell_block(output));
        }
        prompt
    }

    /// Prompt limited to roughly `max_chars` characters, 0 means unlimited.
    ///
    /// Preamble and task are always kept. The newest shell outputs that fit
    /// are kept and a note records how many older ones were left out. The
    /// context itself is never modified.
    pub fn render_window(&self, max_chars: usize) -> String {
        if max_chars == 0 {
            return self.render();
        }

        let head = self.head();
        let outputs: Vec<&str> = self.shell_outputs().collect();
        let mut budget = max_chars.saturating_sub(head.chars().count());
        let mut kept = Vec::new();

        for output in outputs.iter().rev() {
            let block = Self::shell_block(output);
            let len = block.chars().count();
            if len > budget {
                break;
            }
            budget -= len;
            kept.push(block);
        }

        let omitted = outputs.len() - kept.len();
        let mut prompt = head;
        if omitted > 0 {
            prompt.push_str(&format!("\n[{} earlier shell outputs omitted]\n", omitted));
        }
        for block in kept.iter().rev() {
            prompt.push_str(block);
        }
        prompt
    }
}
