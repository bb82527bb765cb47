use anyhow::Result;
use blockdoc_config::Config;
use blockdoc_engine::editing::SlashCommand;
use blockdoc_engine::editing::markup;
use blockdoc_engine::editing::selection::{ElementHandle, SelectionSnapshot};
use blockdoc_engine::{
    BlockKind, BlockType, DocumentBlock, DocumentIndex, EditorSession, FsDocumentStore,
    FsUploadTransport, LocalFile, NotificationQueue, Paste, PasteOutcome, Patch, SessionConfig,
    TableSize, io, text_len,
};
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        Event, KeyCode, KeyEvent, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use mime_sniffer::MimeTypeSniffer;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::{
    env,
    fs::File,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
    sync::Arc,
    time::Duration,
};
use tokio::runtime::Runtime;

type Session = EditorSession<FsDocumentStore, FsUploadTransport>;

/// Text types Tab cycles through, in order.
const CYCLE: [BlockType; 8] = [
    BlockType::Paragraph,
    BlockType::Heading1,
    BlockType::Heading2,
    BlockType::Heading3,
    BlockType::BulletedList,
    BlockType::NumberedList,
    BlockType::Quote,
    BlockType::Code,
];

struct Editor {
    session: Session,
    focused: usize,
    caret: usize,
    /// URL being typed into the link dialog, when one is open.
    link_url: Option<String>,
}

struct App {
    runtime: Runtime,
    store: FsDocumentStore,
    uploads: FsUploadTransport,
    notifications: Arc<NotificationQueue>,
    session_config: SessionConfig,
    index: DocumentIndex,
    list_state: ListState,
    editor: Option<Editor>,
    status: String,
}

impl App {
    fn new(config: &Config) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let store = FsDocumentStore::open(&config.documents_path)?;
        let uploads = FsUploadTransport::new(&config.documents_path, config.uploads.max_upload_mb)
            .with_public_base_url(config.uploads.public_base_url.clone());

        let mut app = Self {
            runtime,
            store,
            uploads,
            notifications: Arc::new(NotificationQueue::new()),
            session_config: session_config(config),
            index: DocumentIndex::new(),
            list_state: ListState::default(),
            editor: None,
            status: String::new(),
        };
        app.refresh_index()?;
        Ok(app)
    }

    fn refresh_index(&mut self) -> Result<()> {
        let mut index = DocumentIndex::new();
        index.extend(self.store.list_documents()?);
        self.index = index;
        if self.index.is_empty() {
            self.list_state.select(None);
        } else {
            let selected = self.list_state.selected().unwrap_or(0);
            self.list_state
                .select(Some(selected.min(self.index.len() - 1)));
        }
        Ok(())
    }

    fn next_document(&mut self) {
        if self.index.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % self.index.len(),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn previous_document(&mut self) {
        if self.index.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.index.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn open_selected(&mut self) -> Result<()> {
        let Some(summary) = self
            .list_state
            .selected()
            .and_then(|index| self.index.get(index))
        else {
            return Ok(());
        };
        let id = summary.id.clone();
        let session = self.runtime.block_on(EditorSession::open(
            self.store.clone(),
            self.uploads.clone(),
            self.notifications.clone(),
            id,
            self.session_config.clone(),
        ))?;
        let caret = session.blocks().first().map(text_len).unwrap_or(0);
        self.status = format!("Editing {}", session.meta().name);
        self.editor = Some(Editor {
            session,
            focused: 0,
            caret,
            link_url: None,
        });
        Ok(())
    }

    fn create_document(&mut self) -> Result<()> {
        let document = self.store.create_document("Untitled")?;
        self.refresh_index()?;
        if let Some(position) = self.index.position(&document.id) {
            self.list_state.select(Some(position));
        }
        self.open_selected()
    }

    fn close_editor(&mut self) -> Result<()> {
        if let Some(editor) = self.editor.take() {
            self.runtime.block_on(editor.session.close());
            self.status = format!("Saved {}", editor.session.meta().name);
        }
        self.refresh_index()
    }

    fn drain_notifications(&mut self) {
        if let Some(last) = self.notifications.drain().pop() {
            self.status = last.message;
        }
    }

    fn handle_paste(&mut self, text: String) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        let Some(block) = editor.focused_block() else {
            return;
        };
        let session = &editor.session;
        let path = Path::new(text.trim());
        let paste = if path.is_file() {
            match read_local_file(path) {
                Ok(file) => Paste::Files(vec![file]),
                Err(e) => {
                    self.status = format!("Cannot read {}: {e}", path.display());
                    return;
                }
            }
        } else {
            session.capture_selection(
                &block.id,
                SelectionSnapshot::caret(ElementHandle(0), editor.caret),
            );
            Paste::Text(text.clone())
        };
        match session.handle_paste(&block.id, paste) {
            PasteOutcome::Uploads(pending) => {
                self.status = format!("Uploading {} file(s)", pending.blocks().len());
            }
            PasteOutcome::Linked(patch) => editor.follow(&patch),
            PasteOutcome::Unhandled => {
                if let Some(text) = text.lines().next() {
                    editor.insert_text(text);
                }
            }
        }
    }
}

impl Editor {
    fn blocks(&self) -> Vec<DocumentBlock> {
        self.session.blocks()
    }

    fn focused_block(&self) -> Option<DocumentBlock> {
        let blocks = self.blocks();
        blocks.get(self.focused.min(blocks.len().saturating_sub(1))).cloned()
    }

    /// Move focus to wherever the last command asked for it.
    fn follow(&mut self, patch: &Patch) {
        let blocks = self.blocks();
        if let Some(focus) = &patch.focus
            && let Some(index) = blocks.iter().position(|b| b.id == focus.block)
        {
            self.focused = index;
            self.caret = focus.caret.unwrap_or_else(|| text_len(&blocks[index]));
        }
        self.clamp(&blocks);
    }

    fn clamp(&mut self, blocks: &[DocumentBlock]) {
        self.focused = self.focused.min(blocks.len().saturating_sub(1));
        let len = blocks.get(self.focused).map(text_len).unwrap_or(0);
        self.caret = self.caret.min(len);
    }

    fn focus_block(&mut self, index: usize) {
        let blocks = self.blocks();
        self.focused = index.min(blocks.len().saturating_sub(1));
        self.caret = blocks.get(self.focused).map(text_len).unwrap_or(0);
    }

    fn insert_text(&mut self, text: &str) {
        let Some(block) = self.focused_block() else {
            return;
        };
        if !block.block_type().is_text() {
            return;
        }
        let content = if block.block_type() == BlockType::Code {
            plain_insert(&block.content, self.caret, text)
        } else {
            markup::insert_at(&block.content, self.caret, &markup::escape_text(text))
        };
        let (patch, command) = self.session.handle_input(&block.id, &content);
        self.caret += text.chars().count();
        match command {
            Some(SlashCommand::Link) => self.link_url = Some(String::new()),
            Some(SlashCommand::Table(_)) => self.caret = 0,
            None => {}
        }
        self.follow(&patch);
    }

    fn delete_backward(&mut self) {
        let Some(block) = self.focused_block() else {
            return;
        };
        if self.caret == 0 {
            let patch = self.session.backspace_at_start(&block.id);
            if patch.removed.is_some() && patch.focus.is_none() {
                self.focus_block(self.focused.saturating_sub(1));
            }
            self.follow(&patch);
            return;
        }
        if !block.block_type().is_text() {
            return;
        }
        let content = if block.block_type() == BlockType::Code {
            plain_remove(&block.content, self.caret - 1)
        } else {
            markup::replace_range(&block.content, self.caret - 1, self.caret, "")
        };
        let (patch, _) = self.session.handle_input(&block.id, &content);
        self.caret -= 1;
        self.follow(&patch);
    }

    fn split(&mut self) {
        if let Some(block) = self.focused_block() {
            let patch = self.session.split_block(&block.id, self.caret);
            self.follow(&patch);
        }
    }

    fn move_focused(&mut self, up: bool) {
        let blocks = self.blocks();
        let target = if up {
            self.focused.checked_sub(1)
        } else {
            Some(self.focused + 1).filter(|i| *i < blocks.len())
        };
        if let Some(target) = target {
            let patch = self
                .session
                .move_block(&blocks[self.focused].id, &blocks[target].id);
            if patch.applied() {
                self.focused = target;
            }
        }
    }

    fn cycle_type(&mut self) {
        let Some(block) = self.focused_block() else {
            return;
        };
        let next = CYCLE
            .iter()
            .position(|t| *t == block.block_type())
            .map_or(BlockType::Paragraph, |i| CYCLE[(i + 1) % CYCLE.len()]);
        let patch = self.session.change_block_type(&block.id, next, None);
        self.follow(&patch);
    }

    fn handle_link_key(&mut self, key: KeyEvent) {
        let Some(url) = self.link_url.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => url.push(c),
            KeyCode::Backspace => {
                url.pop();
            }
            KeyCode::Enter => {
                let url = self.link_url.take().unwrap_or_default();
                self.session.set_link_fields("", &url);
                let patch = self.session.apply_link_dialog();
                self.follow(&patch);
            }
            KeyCode::Esc => {
                self.link_url = None;
                self.session.cancel_link_dialog();
            }
            _ => {}
        }
    }
}

fn session_config(config: &Config) -> SessionConfig {
    SessionConfig {
        idle_commit: Duration::from_secs(config.autosave.idle_commit_secs),
        default_table: TableSize::new(config.tables.default_rows, config.tables.default_columns),
        max_table_dimension: config.tables.max_dimension,
        max_upload_mb: config.uploads.max_upload_mb,
        ..SessionConfig::default()
    }
}

fn plain_insert(content: &str, at: usize, text: &str) -> String {
    let mut chars: Vec<char> = content.chars().collect();
    let at = at.min(chars.len());
    chars.splice(at..at, text.chars());
    chars.into_iter().collect()
}

fn plain_remove(content: &str, at: usize) -> String {
    content
        .chars()
        .enumerate()
        .filter(|(i, _)| *i != at)
        .map(|(_, c)| c)
        .collect()
}

fn read_local_file(path: &Path) -> std::io::Result<LocalFile> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime_type = mime_type(&bytes);
    Ok(LocalFile::new(name, mime_type, bytes))
}

fn mime_type(bytes: &[u8]) -> String {
    bytes
        .sniff_mime_type()
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn init_logging(documents_path: &Path) {
    let Ok(file) = File::create(documents_path.join("blockdoc.log")) else {
        return;
    };
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn main() -> Result<()> {
    // Documents path from CLI args, otherwise from the config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let loaded = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    let from_config;
    let config = match (args.len(), loaded) {
        (2, loaded) => {
            from_config = false;
            let documents_path = PathBuf::from(&args[1]);
            match loaded {
                Some(config) => Config {
                    documents_path,
                    ..config
                },
                None => Config::new(documents_path),
            }
        }
        (1, Some(config)) => {
            from_config = true;
            config
        }
        (1, None) => {
            eprintln!("Error: No documents path provided and no config file found");
            eprintln!("Usage: {} <documents-folder-path>", args[0]);
            eprintln!("Or create a config file at {}", config_path.display());
            process::exit(1);
        }
        _ => {
            eprintln!("Usage: {} [documents-folder-path]", args[0]);
            process::exit(1);
        }
    };

    if let Err(e) = io::validate_documents_dir(&config.documents_path) {
        let source = if from_config {
            format!(" from config file '{}'", config_path.display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: Documents path '{}'{} is invalid: {e}",
            config.documents_path.display(),
            source
        );
        process::exit(1);
    }

    init_logging(&config.documents_path);
    log::info!("blockdoc starting in {}", config.documents_path.display());

    let mut app = App::new(&config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Flush whatever is still open before leaving
    let closed = app.close_editor();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res.and(closed) {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.drain_notifications();
        terminal.draw(|f| ui(f, app))?;

        // Background saves and uploads change state without input
        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                if app.editor.is_some() {
                    handle_editor_key(app, key)?;
                } else {
                    match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Down | KeyCode::Char('j') => app.next_document(),
                        KeyCode::Up | KeyCode::Char('k') => app.previous_document(),
                        KeyCode::Enter => app.open_selected()?,
                        KeyCode::Char('n') => app.create_document()?,
                        _ => {}
                    }
                }
            }
            Event::Paste(text) => app.handle_paste(text),
            _ => {}
        }
    }
}

fn handle_editor_key(app: &mut App, key: KeyEvent) -> Result<()> {
    let Some(editor) = app.editor.as_mut() else {
        return Ok(());
    };
    if editor.link_url.is_some() {
        editor.handle_link_key(key);
        return Ok(());
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.close_editor()?,
        KeyCode::Up if ctrl => editor.move_focused(true),
        KeyCode::Down if ctrl => editor.move_focused(false),
        KeyCode::Up => editor.focus_block(editor.focused.saturating_sub(1)),
        KeyCode::Down => editor.focus_block(editor.focused + 1),
        KeyCode::Left => editor.caret = editor.caret.saturating_sub(1),
        KeyCode::Right => {
            editor.caret += 1;
            let blocks = editor.blocks();
            editor.clamp(&blocks);
        }
        KeyCode::Tab => editor.cycle_type(),
        KeyCode::Enter => editor.split(),
        KeyCode::Backspace => editor.delete_backward(),
        KeyCode::Char(c) if !ctrl => editor.insert_text(c.encode_utf8(&mut [0; 4])),
        _ => {}
    }
    Ok(())
}

fn block_lines(block: &DocumentBlock, caret: Option<usize>, uploading: bool) -> Vec<Line<'static>> {
    let mut text = match block.block_type() {
        BlockType::Code => block.content.clone(),
        _ => markup::to_plain_text(&block.content),
    };
    if let Some(caret) = caret {
        let at = text
            .char_indices()
            .nth(caret)
            .map_or(text.len(), |(index, _)| index);
        text.insert(at, '▏');
    }

    let lines: Vec<String> = match &block.kind {
        BlockKind::Heading1 => vec![format!("# {text}")],
        BlockKind::Heading2 => vec![format!("## {text}")],
        BlockKind::Heading3 => vec![format!("### {text}")],
        BlockKind::BulletedList => vec![format!("• {text}")],
        BlockKind::NumberedList => vec![format!("1. {text}")],
        BlockKind::Quote => text.lines().map(|l| format!("> {l}")).collect(),
        BlockKind::Code => std::iter::once("```".to_string())
            .chain(text.lines().map(str::to_string))
            .chain(std::iter::once("```".to_string()))
            .collect(),
        BlockKind::Table { table } => table
            .rows
            .iter()
            .map(|row| {
                let cells: Vec<String> = row
                    .cells
                    .iter()
                    .map(|c| markup::to_plain_text(&c.content))
                    .collect();
                format!("| {} |", cells.join(" | "))
            })
            .collect(),
        BlockKind::Image { url, .. } | BlockKind::File { url, .. } => {
            let label = if block.block_type() == BlockType::Image {
                "image"
            } else {
                "file"
            };
            let target = url.as_deref().unwrap_or("(empty)");
            let name = block.file_name().unwrap_or_default();
            vec![format!("[{label}] {name} {target}")]
        }
        _ => vec![text],
    };

    let style = if caret.is_some() {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let mut lines: Vec<Line<'static>> = lines
        .into_iter()
        .map(|l| Line::from(Span::styled(l, style)))
        .collect();
    if uploading {
        lines.push(Line::from(Span::styled(
            "  uploading…",
            Style::default().fg(Color::Yellow),
        )));
    }
    lines
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(rows[0]);

    // Document list panel
    let items: Vec<ListItem> = app
        .index
        .documents()
        .map(|summary| {
            let category = summary
                .category
                .as_deref()
                .map(|c| format!(" [{c}]"))
                .unwrap_or_default();
            ListItem::new(Line::from(format!("📄 {}{category}", summary.name)))
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Documents"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(list, chunks[0], &mut app.list_state);

    // Content panel
    let (title, content) = match &app.editor {
        Some(editor) => {
            let meta = editor.session.meta();
            let title = format!("{} (rev {})", meta.name, meta.revision);
            let lines: Vec<Line> = editor
                .blocks()
                .iter()
                .enumerate()
                .flat_map(|(i, block)| {
                    let caret = (i == editor.focused).then_some(editor.caret);
                    let uploading = editor.session.is_uploading(&block.id);
                    block_lines(block, caret, uploading)
                })
                .collect();
            (title, lines)
        }
        None => (
            "Content".to_string(),
            vec![Line::from("Press Enter to open a document or n to create one")],
        ),
    };
    let content = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(content, chunks[1]);

    // Help and status
    let help = match &app.editor {
        Some(editor) if editor.link_url.is_some() => format!(
            "Link URL: {} | Enter: Apply | Esc: Cancel",
            editor.link_url.as_deref().unwrap_or_default()
        ),
        Some(_) => "Esc: Close | Enter: Split | Tab: Block type | Ctrl+↑/↓: Move | /table 2x3 | /link"
            .to_string(),
        None => "q: Quit | ↑/k: Previous | ↓/j: Next | Enter: Open | n: New".to_string(),
    };
    let footer = Paragraph::new(vec![
        Line::from(help),
        Line::from(Span::styled(
            app.status.clone(),
            Style::default().fg(Color::Cyan),
        )),
    ]);
    f.render_widget(footer, rows[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_from_config() {
        let mut config = Config::new("/tmp/docs");
        config.autosave.idle_commit_secs = 3;
        config.tables.default_rows = 0;

        let session = session_config(&config);

        assert_eq!(session.idle_commit, Duration::from_secs(3));
        assert_eq!(session.default_table, TableSize::new(1, 3));
        assert_eq!(session.max_upload_mb, 50);
        assert!(!session.read_only);
    }

    #[test]
    fn test_plain_edits_respect_char_boundaries() {
        assert_eq!(plain_insert("héllo", 2, "X"), "héXllo");
        assert_eq!(plain_insert("ab", 10, "c"), "abc");
        assert_eq!(plain_remove("héllo", 1), "hllo");
    }

    #[test]
    fn test_mime_type_is_sniffed_from_content() {
        assert_eq!(mime_type(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"), "image/png");
        assert_eq!(mime_type(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(mime_type(&[0u8, 1, 2, 3]), "application/octet-stream");
    }
}
