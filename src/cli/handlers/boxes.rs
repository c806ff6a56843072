use super::{CmdResult, Workspace, print_json};
use crate::cli::commands::{BoxAction, BoxCmd, BoxMoveArgs, BoxNewArgs, BoxRenameArgs};
use crate::cli::output::{box_to_json, format_box_line};
use crate::model::registry::{ContainerId, Position};

pub(super) fn cmd_box(ws: &Workspace, args: BoxCmd, json: bool) -> CmdResult {
    match args.action {
        BoxAction::New(args) => cmd_box_new(ws, args, json),
        BoxAction::Rename(args) => cmd_box_rename(ws, args),
        BoxAction::Move(args) => cmd_box_move(ws, args),
        BoxAction::List => cmd_box_list(ws, json),
    }
}

fn cmd_box_new(ws: &Workspace, args: BoxNewArgs, json: bool) -> CmdResult {
    let created = ws.modify(|session| {
        let container = session.registry_mut().create(args.title, args.at).clone();
        Ok(box_to_json(session, &container))
    })?;

    if json {
        print_json(&created)
    } else {
        println!("{}", created.id);
        Ok(())
    }
}

fn cmd_box_rename(ws: &Workspace, args: BoxRenameArgs) -> CmdResult {
    let id = ContainerId::from(args.id.as_str());
    ws.modify(|session| Ok(session.registry_mut().rename(&id, args.title)?))?;
    println!("{}", id);
    Ok(())
}

fn cmd_box_move(ws: &Workspace, args: BoxMoveArgs) -> CmdResult {
    let id = ContainerId::from(args.id.as_str());
    let position = Position {
        x: args.x,
        y: args.y,
    };
    ws.modify(|session| Ok(session.registry_mut().reposition(&id, position)?))?;
    println!("{}", id);
    Ok(())
}

fn cmd_box_list(ws: &Workspace, json: bool) -> CmdResult {
    let session = ws.load()?;
    if json {
        let boxes: Vec<_> = session
            .registry()
            .iter()
            .map(|c| box_to_json(&session, c))
            .collect();
        return print_json(&boxes);
    }
    for container in session.registry().iter() {
        println!("{}", format_box_line(container));
    }
    Ok(())
}
