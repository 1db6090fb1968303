//! Page-side probe scripts, one builder per surface operation.
//!
//! The timeline exposes no automation API, so every probe is a small IIFE
//! evaluated in the page. Class names on the far side churn with releases;
//! the scripts match on substrings and roles rather than exact selectors.

/// Scan the rendered window for date headings inside the vertical band.
/// Returns `[{text, x, y}]`, unsorted; ordering is the locator's job.
pub fn visible_groups(band_top: f64, bottom_margin: f64) -> String {
    VISIBLE_GROUPS_TEMPLATE
        .replace("__BAND_TOP__", &band_top.to_string())
        .replace("__BOTTOM_MARGIN__", &bottom_margin.to_string())
}

const VISIBLE_GROUPS_TEMPLATE: &str = r#"
(function() {
    const headings = [];
    document.querySelectorAll('*').forEach(el => {
        const text = el.textContent?.trim() || '';
        if (/^\d{1,2}\s+(January|February|March|April|May|June|July|August|September|October|November|December)(\s+\d{4})?$/i.test(text)) {
            const rect = el.getBoundingClientRect();
            if (rect.top >= __BAND_TOP__ && rect.top < window.innerHeight - __BOTTOM_MARGIN__ && rect.width > 0) {
                headings.push({
                    text: text,
                    x: rect.left,
                    y: rect.top + (rect.height / 2)
                });
            }
        }
    });
    return headings;
})()
"#;

/// Toggle an unchecked checkbox-like control near the target row.
/// Returns true when one was clicked.
pub fn toggle_checkbox_near(target_y: f64, tolerance: f64) -> String {
    TOGGLE_CHECKBOX_TEMPLATE
        .replace("__TARGET_Y__", &target_y.to_string())
        .replace("__TOLERANCE__", &tolerance.to_string())
}

const TOGGLE_CHECKBOX_TEMPLATE: &str = r#"
(function() {
    const targetY = __TARGET_Y__;
    const checkboxes = document.querySelectorAll('input[type="checkbox"], [class*="checkbox"], [class*="Checkbox"]');
    for (const cb of checkboxes) {
        const rect = cb.getBoundingClientRect();
        if (Math.abs(rect.top + rect.height / 2 - targetY) < __TOLERANCE__) {
            if (!cb.checked && !cb.classList.contains('checked')) {
                cb.click();
                return true;
            }
        }
    }
    return false;
})()
"#;

/// Activate the first checkbox-like element stacked under the point.
/// Returns true when one was clicked.
pub fn activate_under_point(x: f64, y: f64) -> String {
    ACTIVATE_UNDER_POINT_TEMPLATE
        .replace("__X__", &x.to_string())
        .replace("__Y__", &y.to_string())
}

const ACTIVATE_UNDER_POINT_TEMPLATE: &str = r#"
(function() {
    const elements = document.elementsFromPoint(__X__, __Y__);
    for (const el of elements) {
        if (el.tagName === 'INPUT' ||
            el.className?.includes('checkbox') ||
            el.className?.includes('Checkbox') ||
            el.role === 'checkbox') {
            el.click();
            return true;
        }
    }
    return false;
})()
"#;

/// Whether an active-selection indicator is present: a selection toolbar
/// showing a file counter, a checked checkbox input, or a checked marker.
pub const SELECTION_ACTIVE_PROBE: &str = r#"
(function() {
    const selectionBar = document.querySelector('[class*="selection"], [class*="toolbar"]');
    if (selectionBar) {
        const text = selectionBar.textContent || '';
        if (/\d+\s*(file|файл|item)/i.test(text)) {
            return true;
        }
    }
    if (document.querySelectorAll('input[type="checkbox"]:checked').length > 0) return true;
    if (document.querySelectorAll('[class*="checkbox"][class*="checked"]').length > 0) return true;
    return false;
})()
"#;

/// Leftover checked markers on tiles, checked after a dismiss attempt.
pub const RESIDUAL_SELECTION_PROBE: &str = r#"
(function() {
    const checked = document.querySelectorAll('[class*="checkbox"][class*="checked"], [class*="selected"]');
    return checked.length > 0;
})()
"#;

/// Find and click the download control by text/aria/title heuristics.
/// Returns true when one was clicked.
pub const TRIGGER_DOWNLOAD: &str = r#"
(function() {
    const buttons = document.querySelectorAll('button, [role="button"]');
    for (const btn of buttons) {
        const text = btn.textContent?.trim() || '';
        const ariaLabel = btn.getAttribute('aria-label') || '';
        const title = btn.getAttribute('title') || '';
        if (text === 'Download' ||
            text === 'Скачать' ||
            ariaLabel.includes('Download') ||
            ariaLabel.includes('Скачать') ||
            title.includes('Download')) {
            btn.click();
            return true;
        }
    }
    return false;
})()
"#;

/// Locate the close/deselect control in the toolbar region.
/// Returns `{found, x, y, info}` so the caller can dispatch a trusted click.
pub const FIND_DISMISS_CONTROL: &str = r#"
(function() {
    const selectors = [
        'button[aria-label*="close" i]',
        'button[aria-label*="deselect" i]',
        '[class*="close"]',
        '[class*="Close"]',
        'svg[class*="close"]',
        'button:has(svg)',
    ];
    for (const selector of selectors) {
        const elements = document.querySelectorAll(selector);
        for (const el of elements) {
            const rect = el.getBoundingClientRect();
            if (rect.top < 150 && rect.width > 0 && rect.height > 0) {
                const text = el.textContent?.trim() || '';
                const ariaLabel = el.getAttribute('aria-label') || '';
                if (text === '×' || text === 'X' || text === '' ||
                    ariaLabel.toLowerCase().includes('close') ||
                    ariaLabel.toLowerCase().includes('deselect')) {
                    return {
                        x: rect.left + rect.width / 2,
                        y: rect.top + rect.height / 2,
                        found: true,
                        info: ariaLabel || text || 'button'
                    };
                }
            }
        }
    }
    const allButtons = document.querySelectorAll('button, [role="button"]');
    for (const btn of allButtons) {
        const rect = btn.getBoundingClientRect();
        if (rect.top < 100 && rect.right > window.innerWidth - 200) {
            const text = btn.textContent?.trim() || '';
            if (text === '×' || text === 'X' || text.length <= 2) {
                return {
                    x: rect.left + rect.width / 2,
                    y: rect.top + rect.height / 2,
                    found: true,
                    info: 'corner-button'
                };
            }
        }
    }
    return { found: false };
})()
"#;

/// Scroll the window down by a pixel delta.
pub fn scroll_by(delta_y: f64) -> String {
    format!("window.scrollBy(0, {delta_y})")
}

/// Whether the page shows the identity-provider sign-in form.
pub const LOGIN_PAGE_PROBE: &str = r#"
(function() {
    const pageText = document.body?.innerText || '';
    const loginIndicators = [
        pageText.includes('Log in with Yandex ID'),
        pageText.includes('Войти с Яндекс ID'),
        pageText.includes('Yandex ID'),
        pageText.includes('Username or email'),
        pageText.includes('Логин или email'),
        pageText.includes('Create ID'),
        pageText.includes('Создать ID'),
        pageText.includes('Face or fingerprint login'),
        !!document.querySelector('input[name="login"]'),
        !!document.querySelector('input[placeholder*="Username"]'),
        !!document.querySelector('input[placeholder*="email"]'),
        !!document.querySelector('button[data-t="button:pseudo"]'),
        !!document.querySelector('[class*="AuthLoginInputToggle"]'),
        !!document.querySelector('[class*="Passport"]'),
        !!document.querySelector('[data-t="login"]'),
        !!document.querySelector('form[action*="passport"]'),
        !!document.querySelector('form[action*="auth"]'),
    ];
    return loginIndicators.some(indicator => indicator === true);
})()
"#;

/// Count of signed-in application markers; two or more means the file
/// manager shell is rendered and the user is signed in.
pub const APP_MARKER_COUNT_PROBE: &str = r#"
(function() {
    const diskIndicators = [
        !!document.querySelector('[class*="photo"]'),
        !!document.querySelector('[class*="Photo"]'),
        !!document.querySelector('[class*="listing"]'),
        !!document.querySelector('[class*="Listing"]'),
        !!document.querySelector('[class*="user"]'),
        !!document.querySelector('[class*="User"]'),
        !!document.querySelector('[class*="avatar"]'),
        !!document.querySelector('[class*="Avatar"]'),
        !!document.querySelector('[class*="sidebar"]'),
        !!document.querySelector('[class*="Sidebar"]'),
        !!document.querySelector('[href*="/client/"]'),
    ];
    return diskIndicators.filter(i => i === true).length;
})()
"#;

/// Open the "Show:" filter dropdown. Returns true when the button was found.
pub const FILTER_MENU_OPEN: &str = r#"
(function() {
    const button = document.querySelector('button.Select2-Button[aria-label^="Show:"]')
        || document.querySelector('button[role="listbox"].Select2-Button');
    if (button) {
        button.click();
        return true;
    }
    return false;
})()
"#;

/// Pick the "From unlimited storage" entry in the opened filter dropdown.
pub const FILTER_PICK_UNLIMITED: &str = r#"
(function() {
    const menuItems = document.querySelectorAll('.Menu-Item[role="option"], [role="option"]');
    for (const item of menuItems) {
        if (item.textContent.includes('unlimited storage') ||
            item.textContent.includes('Unlimited storage')) {
            item.click();
            return true;
        }
    }
    return false;
})()
"#;

/// Close the filter dropdown again (re-click the button, else body click).
pub const FILTER_MENU_CLOSE: &str = r#"
(function() {
    const button = document.querySelector('button.Select2-Button[aria-label^="Show:"]');
    if (button) {
        button.click();
    } else {
        document.body.click();
    }
    return true;
})()
"#;
