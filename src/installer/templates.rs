//! Shell templates for the installer header and the respond script.

use crate::error::Result;
use handlebars::Handlebars;

pub(super) const HEADER: &str = "header";
pub(super) const RESPOND: &str = "respond";

const HEADER_TEMPLATE: &str = r#"#!/bin/sh
# Self-extracting installer generated by relpack.
# Usage: sh {{file_name}} [--prefix=DIR] [--help]

PREFIX="$(pwd)"

for arg in "$@"; do
    case "$arg" in
        --prefix=*)
            PREFIX="${arg#--prefix=}"
            ;;
        -h|--help)
            echo "Usage: $0 [--prefix=DIR]"
            echo "  --prefix=DIR  install into DIR (default: current directory)"
            echo "  --help        show this help"
            exit 0
            ;;
        *)
            echo "unknown option: $arg" >&2
            exit 1
            ;;
    esac
done

mkdir -p "$PREFIX" || exit 1
PAYLOAD_LINE=$(awk '/^{{marker}}$/ { print NR + 1; exit 0; }' "$0")
if [ -z "$PAYLOAD_LINE" ]; then
    echo "payload not found in $0" >&2
    exit 1
fi

echo "installing into $PREFIX"
tail -n+"$PAYLOAD_LINE" "$0" | (cd "$PREFIX" && tar {{tar_args}} -f -) || exit 1

if [ -f "$PREFIX/{{respond}}" ]; then
    sh "$PREFIX/{{respond}}" || exit 1
fi
exit 0
{{marker}}
"#;

const RESPOND_TEMPLATE: &str = r#"#!/bin/sh
# Post-install steps generated by relpack. Removes itself when done and
# exits non-zero if any step failed.
TOPLEVEL="$(cd "$(dirname "$0")" && pwd)"
RELPACK_FAILED=0

# Dangling symlinks count as present.
relpack_present() {
    [ -e "$1" ] || [ -L "$1" ]
}

relpack_apply_target() {
    TARGET="${1%.new}"
    NAME="$(basename "$TARGET")"
    DIR="$(dirname "$TARGET")"
    [ -f "$1" ] || return 1
    mkdir -p "$DIR/old" || return 1
    if relpack_present "$DIR/old/$NAME.3"; then rm -f "$DIR/old/$NAME.3" || return 1; fi
    if relpack_present "$DIR/old/$NAME.2"; then mv -f "$DIR/old/$NAME.2" "$DIR/old/$NAME.3" || return 1; fi
    if relpack_present "$DIR/old/$NAME.1"; then mv -f "$DIR/old/$NAME.1" "$DIR/old/$NAME.2" || return 1; fi
    if relpack_present "$DIR/$NAME.old"; then mv -f "$DIR/$NAME.old" "$DIR/old/$NAME.1" || return 1; fi
    if relpack_present "$TARGET"; then mv -f "$TARGET" "$TARGET.old" || return 1; fi
    mv -f "$1" "$TARGET"
}

relpack_apply_profile() {
    TARGET="${1%.template}"
    DIR="$(dirname "$TARGET")"
    [ -f "$1" ] || return 1
    mkdir -p "$DIR" || return 1
    if relpack_present "$TARGET"; then
        if command -v git >/dev/null 2>&1; then
            git --no-pager diff --no-index "$TARGET" "$1"
        elif command -v diff >/dev/null 2>&1; then
            diff -u "$TARGET" "$1"
        fi
        rm -f "$1"
    else
        mv -f "$1" "$TARGET"
    fi
}

{{#each directives}}
echo "{{label}} $TOPLEVEL/{{path}}"
{{function}} "$TOPLEVEL/{{path}}" || {
    echo "failed: $TOPLEVEL/{{path}}" >&2
    RELPACK_FAILED=1
}
{{/each}}

rm -f "$TOPLEVEL/{{respond}}"
exit ${RELPACK_FAILED:-0}
"#;

/// Registry with both installer templates, no HTML escaping and strict
/// variable lookup.
pub(super) fn registry() -> Result<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);
    handlebars.register_template_string(HEADER, HEADER_TEMPLATE)?;
    handlebars.register_template_string(RESPOND, RESPOND_TEMPLATE)?;
    Ok(handlebars)
}
