//! Closed set of action identifiers a gesture can be bound to.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Desktop-automation action identifier.
///
/// Bindings store the identifier's name; executors are registered per identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionId {
    // Audio and media
    VolumeUp,
    VolumeDown,
    Mute,
    Unmute,
    PlayMedia,
    PauseMedia,
    NextTrack,
    PreviousTrack,
    // System and windows
    Screenshot,
    LockScreen,
    MinimizeAllWindows,
    MaximizeCurrentWindow,
    MinimizeCurrentWindow,
    TabSwitch,
    // Browser
    NewTab,
    CloseTab,
    ReopenClosedTab,
    RefreshPage,
    ScrollUp,
    ScrollDown,
    ZoomIn,
    ZoomOut,
    OpenYoutube,
    OpenChatGpt,
    // Development
    OpenVsCode,
    NewFileInVsCode,
    OpenTerminal,
    RunCode,
    GitPull,
    GitPush,
    CreateHtmlTemplate,
    CreateReactComponent,
    CreateNodeApiTemplate,
    CreateReadme,
    // Files
    CreateNewFolder,
    RenameSelectedFile,
    DeleteSelectedFile,
    OpenDownloads,
    OpenDocuments,
    OpenDesktop,
    // Modes
    PresentationMode,
    MeetingMode,
    StudyMode,
    FocusMode,
}

impl ActionId {
    pub fn all() -> &'static [ActionId] {
        &[
            Self::VolumeUp,
            Self::VolumeDown,
            Self::Mute,
            Self::Unmute,
            Self::PlayMedia,
            Self::PauseMedia,
            Self::NextTrack,
            Self::PreviousTrack,
            Self::Screenshot,
            Self::LockScreen,
            Self::MinimizeAllWindows,
            Self::MaximizeCurrentWindow,
            Self::MinimizeCurrentWindow,
            Self::TabSwitch,
            Self::NewTab,
            Self::CloseTab,
            Self::ReopenClosedTab,
            Self::RefreshPage,
            Self::ScrollUp,
            Self::ScrollDown,
            Self::ZoomIn,
            Self::ZoomOut,
            Self::OpenYoutube,
            Self::OpenChatGpt,
            Self::OpenVsCode,
            Self::NewFileInVsCode,
            Self::OpenTerminal,
            Self::RunCode,
            Self::GitPull,
            Self::GitPush,
            Self::CreateHtmlTemplate,
            Self::CreateReactComponent,
            Self::CreateNodeApiTemplate,
            Self::CreateReadme,
            Self::CreateNewFolder,
            Self::RenameSelectedFile,
            Self::DeleteSelectedFile,
            Self::OpenDownloads,
            Self::OpenDocuments,
            Self::OpenDesktop,
            Self::PresentationMode,
            Self::MeetingMode,
            Self::StudyMode,
            Self::FocusMode,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VolumeUp => "VolumeUp",
            Self::VolumeDown => "VolumeDown",
            Self::Mute => "Mute",
            Self::Unmute => "Unmute",
            Self::PlayMedia => "PlayMedia",
            Self::PauseMedia => "PauseMedia",
            Self::NextTrack => "NextTrack",
            Self::PreviousTrack => "PreviousTrack",
            Self::Screenshot => "Screenshot",
            Self::LockScreen => "LockScreen",
            Self::MinimizeAllWindows => "MinimizeAllWindows",
            Self::MaximizeCurrentWindow => "MaximizeCurrentWindow",
            Self::MinimizeCurrentWindow => "MinimizeCurrentWindow",
            Self::TabSwitch => "TabSwitch",
            Self::NewTab => "NewTab",
            Self::CloseTab => "CloseTab",
            Self::ReopenClosedTab => "ReopenClosedTab",
            Self::RefreshPage => "RefreshPage",
            Self::ScrollUp => "ScrollUp",
            Self::ScrollDown => "ScrollDown",
            Self::ZoomIn => "ZoomIn",
            Self::ZoomOut => "ZoomOut",
            Self::OpenYoutube => "OpenYoutube",
            Self::OpenChatGpt => "OpenChatGpt",
            Self::OpenVsCode => "OpenVsCode",
            Self::NewFileInVsCode => "NewFileInVsCode",
            Self::OpenTerminal => "OpenTerminal",
            Self::RunCode => "RunCode",
            Self::GitPull => "GitPull",
            Self::GitPush => "GitPush",
            Self::CreateHtmlTemplate => "CreateHtmlTemplate",
            Self::CreateReactComponent => "CreateReactComponent",
            Self::CreateNodeApiTemplate => "CreateNodeApiTemplate",
            Self::CreateReadme => "CreateReadme",
            Self::CreateNewFolder => "CreateNewFolder",
            Self::RenameSelectedFile => "RenameSelectedFile",
            Self::DeleteSelectedFile => "DeleteSelectedFile",
            Self::OpenDownloads => "OpenDownloads",
            Self::OpenDocuments => "OpenDocuments",
            Self::OpenDesktop => "OpenDesktop",
            Self::PresentationMode => "PresentationMode",
            Self::MeetingMode => "MeetingMode",
            Self::StudyMode => "StudyMode",
            Self::FocusMode => "FocusMode",
        }
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase alphanumerics only: "Volume Up", "volume_up" and "VolumeUp" compare equal.
fn fold_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl std::str::FromStr for ActionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let folded = fold_name(s);
        if folded.is_empty() {
            return Err(Error::UnknownAction(s.to_string()));
        }
        Self::all()
            .iter()
            .copied()
            .find(|id| fold_name(id.as_str()) == folded)
            .ok_or_else(|| Error::UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_parsing() {
        assert_eq!("Volume Up".parse::<ActionId>().unwrap(), ActionId::VolumeUp);
        assert_eq!("volume_up".parse::<ActionId>().unwrap(), ActionId::VolumeUp);
        assert_eq!("Mute".parse::<ActionId>().unwrap(), ActionId::Mute);
        assert_eq!(
            "New File in VS Code".parse::<ActionId>().unwrap(),
            ActionId::NewFileInVsCode
        );
        assert_eq!(
            "Create HTML Template".parse::<ActionId>().unwrap(),
            ActionId::CreateHtmlTemplate
        );
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        assert!(matches!(
            "Launch Rocket".parse::<ActionId>(),
            Err(Error::UnknownAction(_))
        ));
        assert!("".parse::<ActionId>().is_err());
    }

    #[test]
    fn test_every_name_round_trips() {
        for id in ActionId::all() {
            assert_eq!(id.as_str().parse::<ActionId>().unwrap(), *id);
        }
    }
}
