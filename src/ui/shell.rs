//! Line-oriented terminal front end: the domain list, then one detail screen at a time.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::debug;

use crate::provider::TokenProvider;
use crate::ui::bootstrap::App;
use crate::ui::detail::DomainDetail;
use crate::ui::domains::DomainList;
use crate::ui::navigation::{Navigator, Screen};

#[derive(Debug, PartialEq, Eq)]
enum Exit {
    Back,
    Quit,
}

/// Run the interactive loop until `q` or end of input.
pub async fn run<P, R, W>(app: &App<P>, input: R, output: &mut W) -> Result<()>
where
    P: TokenProvider,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut navigator = Navigator::new();
    let list = app.domain_list();

    loop {
        render_domains(&list, output)?;
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let choice = line.trim();
        match choice {
            "" => continue,
            "q" => return Ok(()),
            _ => {
                let selected = choice
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|index| list.select(index, &mut navigator));
                match selected {
                    Some(detail) => {
                        if run_detail(detail, &mut navigator, &mut lines, output).await? == Exit::Quit {
                            return Ok(());
                        }
                    }
                    None => writeln!(output, "Unknown choice '{}'", choice)?,
                }
            }
        }
    }
}

async fn run_detail<P, R, W>(
    mut detail: DomainDetail<P>,
    navigator: &mut Navigator,
    lines: &mut Lines<R>,
    output: &mut W,
) -> Result<Exit>
where
    P: TokenProvider,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        render_detail(&detail, output)?;
        let Some(line) = lines.next_line().await? else {
            return Ok(Exit::Quit);
        };
        match line.trim() {
            "" => {}
            "r" => {
                detail.refresh();
            }
            "u" => detail.options.request_user_token = !detail.options.request_user_token,
            "f" => detail.options.force_renewal = !detail.options.force_renewal,
            "c" => detail.options.use_custom_presentation = !detail.options.use_custom_presentation,
            "t" => {
                let outcome = detail
                    .request_token_with(navigator, tokio::signal::ctrl_c(), |navigator| {
                        // rendering failures only lose the hint, the request keeps going
                        let _ = render_navigation(navigator, output);
                    })
                    .await;
                match outcome {
                    Ok(display) => writeln!(output, "{}", display)?,
                    Err(alert) => writeln!(output, "[{}] {}", alert.title, alert.message)?,
                }
            }
            "d" => {
                detail
                    .provider()
                    .discard_token_for_domain(detail.domain())
                    .await;
                detail.refresh();
            }
            "b" => {
                navigator.pop();
                return Ok(Exit::Back);
            }
            "q" => return Ok(Exit::Quit),
            other => writeln!(output, "Unknown command '{}'", other)?,
        }
    }
}

fn render_domains<P: TokenProvider, W: Write>(list: &DomainList<P>, output: &mut W) -> Result<()> {
    writeln!(output, "Domains")?;
    for (index, row) in list.rows().iter().enumerate() {
        writeln!(output, "  {}. {}", index + 1, row)?;
    }
    writeln!(output, "Select a domain number, or q to quit")?;
    Ok(())
}

fn render_detail<P: TokenProvider, W: Write>(detail: &DomainDetail<P>, output: &mut W) -> Result<()> {
    let on_off = |flag: bool| if flag { "on" } else { "off" };
    writeln!(output, "{}", detail.title().unwrap_or(detail.domain()))?;
    writeln!(output, "Token: {}", detail.display())?;
    writeln!(output, "  [u] User token: {}", on_off(detail.options.request_user_token))?;
    writeln!(output, "  [f] Force renewal: {}", on_off(detail.options.force_renewal))?;
    writeln!(output, "  [c] Custom presentation: {}", on_off(detail.options.use_custom_presentation))?;
    writeln!(output, "  [t] Retrieve token  [r] Refresh  [d] Discard  [b] Back  [q] Quit")?;
    Ok(())
}

fn render_navigation<W: Write>(navigator: &Navigator, output: &mut W) -> Result<()> {
    debug!("navigation depth {}", navigator.depth());
    match navigator.top() {
        Screen::Credentials(view) => writeln!(
            output,
            "Credentials for {}: visit {} and enter the code {}",
            view.domain, view.verification_url, view.user_code
        )?,
        Screen::Domain(domain) => writeln!(output, "Back to {}", domain)?,
        Screen::Domains => {}
    }
    Ok(())
}
